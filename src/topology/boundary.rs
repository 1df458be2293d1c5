use std::collections::{BTreeMap, BTreeSet};

use crate::mesh::{Edge, Mesh};

use super::Adjacency;

/// Chains the boundary edges of a mesh into loops.
///
/// Each loop is a list of local edges oriented along the winding of the
/// face it borders. Loops are sorted longest first, so on an open sheet the
/// first loop is the outer perimeter.
#[derive(Debug, Clone, Default)]
pub struct BoundaryLoops;

impl BoundaryLoops {
    /// Creates a new `BoundaryLoops` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the query.
    #[must_use]
    pub fn execute(&self, mesh: &Mesh) -> Vec<Vec<Edge>> {
        self.execute_with(&Adjacency::new(mesh))
    }

    /// Executes the query against prebuilt adjacency.
    #[must_use]
    pub fn execute_with(&self, adjacency: &Adjacency) -> Vec<Vec<Edge>> {
        // Common start group to (common, local) boundary edges leaving it.
        let mut outgoing: BTreeMap<usize, Vec<(Edge, Edge)>> = BTreeMap::new();
        for (common, faces) in adjacency.edges() {
            let [f] = faces else {
                continue;
            };
            let Some(local) = adjacency.local_edge(*f, common) else {
                continue;
            };
            let Some(oriented) = adjacency.common(&local) else {
                continue;
            };
            outgoing.entry(oriented.a).or_default().push((oriented, local));
        }

        let mut used: BTreeSet<Edge> = BTreeSet::new();
        let mut loops = Vec::new();
        let starts: Vec<(Edge, Edge)> = outgoing.values().flatten().copied().collect();
        for (start, start_local) in starts {
            if used.contains(&start) {
                continue;
            }
            used.insert(start);
            let mut chain = vec![start_local];
            let mut at = start.b;
            while at != start.a {
                let Some(&(next, local)) = outgoing
                    .get(&at)
                    .and_then(|out| out.iter().find(|(e, _)| !used.contains(e)))
                else {
                    break;
                };
                used.insert(next);
                chain.push(local);
                at = next.b;
            }
            loops.push(chain);
        }
        loops.sort_by(|a, b| b.len().cmp(&a.len()));
        loops
    }
}
