use std::collections::BTreeSet;

use crate::context::Selection;
use crate::error::Result;
use crate::mesh::{Edge, Mesh};

use super::Adjacency;

/// Elements of a selection that touch at least one unselected element of
/// the same kind (the ring a "shrink selection" removes).
#[derive(Debug, Clone)]
pub struct PerimeterElements {
    selection: Selection,
}

impl PerimeterElements {
    /// Creates a new `PerimeterElements` query.
    #[must_use]
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    /// Executes the query. The result has the same kind as the input.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// index in the selection.
    pub fn execute(&self, mesh: &Mesh) -> Result<Selection> {
        let adjacency = Adjacency::new(mesh);
        self.selection.check(mesh)?;
        Ok(self.selection.perimeter(mesh, &adjacency))
    }
}

/// Selected faces edge-adjacent to an unselected face.
pub(crate) fn face_perimeter(adjacency: &Adjacency, faces: &[usize]) -> Vec<usize> {
    let selected: BTreeSet<usize> = faces.iter().copied().collect();
    selected
        .iter()
        .copied()
        .filter(|&f| {
            adjacency.face_edges(f).iter().any(|(_, common)| {
                adjacency
                    .faces_of_edge(common)
                    .iter()
                    .any(|n| !selected.contains(n))
            })
        })
        .collect()
}

/// Selected edges with an endpoint touching an unselected edge.
pub(crate) fn edge_perimeter(adjacency: &Adjacency, edges: &[Edge]) -> Vec<Edge> {
    let selected: BTreeSet<Edge> = edges.iter().filter_map(|e| adjacency.common(e)).collect();
    edges
        .iter()
        .copied()
        .filter(|e| {
            adjacency.common(e).is_some_and(|c| {
                [c.a, c.b].iter().any(|&g| {
                    adjacency
                        .spokes(g)
                        .iter()
                        .any(|s| !selected.contains(s))
                })
            })
        })
        .collect()
}

/// Selected vertices connected by an edge to an unselected vertex.
pub(crate) fn vertex_perimeter(mesh: &Mesh, adjacency: &Adjacency, vertices: &[usize]) -> Vec<usize> {
    let groups: BTreeSet<usize> = mesh.shared_vertices().groups_of(vertices).into_iter().collect();
    let mut out: Vec<usize> = vertices
        .iter()
        .copied()
        .filter(|&v| {
            adjacency.group_of(v).is_some_and(|g| {
                adjacency
                    .spokes(g)
                    .iter()
                    .filter_map(|s| s.other(g))
                    .any(|n| !groups.contains(&n))
            })
        })
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
