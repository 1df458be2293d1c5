//! Read-only topology queries computed on demand from a [`Mesh`] and its
//! position groups.

mod adjacency;
mod boundary;
mod edge_loop;
mod neighbors;
pub(crate) mod perimeter;
mod ring;
mod select;
pub(crate) mod texture_groups;

pub use adjacency::Adjacency;
pub use boundary::BoundaryLoops;
pub use edge_loop::EdgeLoop;
pub use neighbors::NeighborFaces;
pub use perimeter::PerimeterElements;
pub use ring::EdgeRing;
pub use select::{GrowSelection, SelectSmoothingGroup, SelectUvShell};
pub use texture_groups::{IncompleteTextureGroups, SelectTextureGroups};

use std::collections::BTreeSet;

use crate::mesh::{Edge, Mesh};

/// Input edges (deduplicated in group space) followed by a local
/// representative of every other common edge in `found`.
pub(crate) fn collect_edges(adjacency: &Adjacency, input: &[Edge], found: &BTreeSet<Edge>) -> Vec<Edge> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(found.len());
    for edge in input {
        if let Some(common) = adjacency.common(edge) {
            if seen.insert(common) {
                out.push(*edge);
            }
        }
    }
    for common in found {
        if seen.insert(*common) {
            if let Some(local) = adjacency.representative(common) {
                out.push(local);
            }
        }
    }
    out
}

/// Every local edge of the mesh, one per common edge, ascending by common
/// edge.
#[must_use]
pub fn all_edges(mesh: &Mesh) -> Vec<Edge> {
    let adjacency = Adjacency::new(mesh);
    adjacency
        .edges()
        .filter_map(|(common, _)| adjacency.representative(common))
        .collect()
}
