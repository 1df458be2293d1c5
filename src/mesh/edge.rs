use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// An edge between two vertex indices.
///
/// Edges are derived from face index lists and never stored on the mesh.
/// Equality, ordering and hashing are orientation independent; the stored
/// order records the winding direction of the face the edge came from.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
}

impl Edge {
    /// Creates an edge from `a` to `b`.
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Orientation independent key, smaller index first.
    #[must_use]
    pub fn key(&self) -> (usize, usize) {
        if self.a <= self.b {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        }
    }

    /// Returns `true` if `index` is one of the endpoints.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.a == index || self.b == index
    }

    /// The endpoint opposite `index`, or `None` if `index` is not on the edge.
    #[must_use]
    pub fn other(&self, index: usize) -> Option<usize> {
        if self.a == index {
            Some(self.b)
        } else if self.b == index {
            Some(self.a)
        } else {
            None
        }
    }

    /// The same edge traversed in the opposite direction.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self::new(self.b, self.a)
    }

    /// Translates the edge into shared-group space using a vertex lookup.
    ///
    /// Returns `None` if either endpoint is outside the lookup.
    #[must_use]
    pub fn to_common(&self, lookup: &[usize]) -> Option<Self> {
        Some(Self::new(*lookup.get(self.a)?, *lookup.get(self.b)?))
    }

    /// Returns `true` if the endpoints are the same index.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl From<(usize, usize)> for Edge {
    fn from((a, b): (usize, usize)) -> Self {
        Self::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn equality_ignores_direction() {
        assert_eq!(Edge::new(3, 7), Edge::new(7, 3));
        let set: HashSet<Edge> = [Edge::new(1, 2), Edge::new(2, 1)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn other_endpoint() {
        let e = Edge::new(4, 9);
        assert_eq!(e.other(4), Some(9));
        assert_eq!(e.other(9), Some(4));
        assert_eq!(e.other(5), None);
    }

    #[test]
    fn common_edge_uses_lookup() {
        let lookup = [0, 0, 1, 2];
        let e = Edge::new(1, 3).to_common(&lookup);
        assert_eq!(e, Some(Edge::new(0, 2)));
        assert!(Edge::new(0, 9).to_common(&lookup).is_none());
    }
}
