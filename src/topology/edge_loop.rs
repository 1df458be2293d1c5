use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Declined, Outcome, Result};
use crate::mesh::{Edge, Mesh};

use super::{collect_edges, Adjacency};

/// Extends selected edges into closed edge loops.
///
/// The walk goes vertex to vertex. At a vertex where four edges meet it
/// continues on the edge sharing no face with the one it arrived on. At a
/// vertex where three edges meet it follows the perimeter of the face it is
/// running along. Any other valence, or a boundary edge, ends the walk
/// without a loop.
#[derive(Debug, Clone)]
pub struct EdgeLoop {
    edges: Vec<Edge>,
}

impl EdgeLoop {
    /// Creates a new `EdgeLoop` query.
    #[must_use]
    pub fn new(edges: &[Edge]) -> Self {
        Self {
            edges: edges.to_vec(),
        }
    }

    /// Executes the query.
    ///
    /// Returns the input edges plus every closed loop found. Declines with
    /// [`Declined::NoLoop`] when no selected edge closes into a loop.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] if an edge
    /// endpoint is stale.
    pub fn execute(&self, mesh: &Mesh) -> Result<Outcome<Vec<Edge>>> {
        let adjacency = Adjacency::new(mesh);
        self.execute_with(mesh, &adjacency)
    }

    /// Executes the query against prebuilt adjacency.
    ///
    /// # Errors
    ///
    /// As [`EdgeLoop::execute`].
    pub fn execute_with(&self, mesh: &Mesh, adjacency: &Adjacency) -> Result<Outcome<Vec<Edge>>> {
        if self.edges.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        let mut found = BTreeSet::new();
        let mut closed = 0;
        for edge in &self.edges {
            mesh.check_vertices(&[edge.a, edge.b])?;
            let Some(common) = adjacency.common(edge) else {
                continue;
            };
            found.insert(common);
            if let Some(path) = walk(adjacency, common) {
                closed += 1;
                found.extend(path);
            }
        }
        if closed == 0 {
            debug!(edges = self.edges.len(), "no closed edge loop");
            return Ok(Declined::NoLoop.into());
        }
        Ok(Outcome::Applied(collect_edges(adjacency, &self.edges, &found)))
    }
}

/// Walks from `start.a` through `start.b` and onwards; returns the edges of
/// the loop when the walk comes back to `start`.
fn walk(adjacency: &Adjacency, start: Edge) -> Option<Vec<Edge>> {
    let mut side = *adjacency.faces_of_edge(&start).first()?;
    if adjacency.faces_of_edge(&start).len() != 2 {
        return None;
    }
    let mut path = vec![start];
    let mut prev = start;
    let mut at = start.b;
    loop {
        let spokes = adjacency.spokes(at);
        let next = match spokes.len() {
            4 => {
                let prev_faces = adjacency.faces_of_edge(&prev);
                let mut candidates = spokes.iter().filter(|s| {
                    **s != prev
                        && !adjacency
                            .faces_of_edge(s)
                            .iter()
                            .any(|f| prev_faces.contains(f))
                });
                let next = *candidates.next()?;
                if candidates.next().is_some() {
                    return None;
                }
                // The side face's other spoke at this vertex picks the face
                // on the same side of the next edge.
                let side_spoke = other_spoke(adjacency, side, at, &prev)?;
                side = adjacency
                    .faces_of_edge(&next)
                    .iter()
                    .copied()
                    .find(|&f| adjacency.face_edges(f).iter().any(|(_, c)| *c == side_spoke))?;
                next
            }
            3 => other_spoke(adjacency, side, at, &prev)?,
            _ => return None,
        };
        if adjacency.is_boundary(&next) || adjacency.faces_of_edge(&next).len() != 2 {
            return None;
        }
        if next == start {
            return Some(path);
        }
        if path.contains(&next) {
            return None;
        }
        path.push(next);
        at = next.other(at)?;
        prev = next;
    }
}

/// The perimeter edge of `face` at group `at` other than `edge`.
fn other_spoke(adjacency: &Adjacency, face: usize, at: usize, edge: &Edge) -> Option<Edge> {
    adjacency
        .face_edges(face)
        .iter()
        .map(|(_, c)| *c)
        .find(|c| c.contains(at) && c != edge)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn cube_edge_closes_around_its_face() {
        let cube = shapes::cube(1.0);
        let outcome = EdgeLoop::new(&[Edge::new(0, 1)]).execute(&cube).unwrap();
        let edges = outcome.applied().unwrap();
        assert_eq!(edges.len(), 4);
        let adjacency = Adjacency::new(&cube);
        // All four lie on the +Z side.
        for e in &edges {
            let common = adjacency.common(e).unwrap();
            assert!(adjacency.faces_of_edge(&common).contains(&0));
        }
    }

    #[test]
    fn open_grid_has_no_loop() {
        let plane = shapes::plane(3.0, 3.0, 3, 3);
        let outcome = EdgeLoop::new(&[Edge::new(1, 2)]).execute(&plane).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NoLoop));
    }

    #[test]
    fn empty_selection_declines() {
        let cube = shapes::cube(1.0);
        let outcome = EdgeLoop::new(&[]).execute(&cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::EmptySelection));
    }
}
