/// Disjoint-set forest whose roots are always the smallest member.
///
/// Keeping the minimum as root makes the resulting partition independent of
/// the order in which unions are performed.
#[derive(Debug, Clone)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression.
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub(crate) fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        if rx < ry {
            self.parent[ry] = rx;
        } else {
            self.parent[rx] = ry;
        }
    }

    /// Root of every element, in element order.
    pub(crate) fn roots(&mut self) -> Vec<usize> {
        (0..self.parent.len()).map(|i| self.find(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_transitive() {
        let mut uf = UnionFind::new(5);
        uf.union(4, 2);
        uf.union(2, 0);
        assert_eq!(uf.find(4), 0);
        assert_eq!(uf.roots(), vec![0, 1, 0, 3, 0]);
    }
}
