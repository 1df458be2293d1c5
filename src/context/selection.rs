use std::collections::BTreeSet;

use crate::error::Result;
use crate::mesh::{Edge, Mesh};
use crate::topology::perimeter::{edge_perimeter, face_perimeter, vertex_perimeter};
use crate::topology::Adjacency;

/// Behavior shared by every selection kind.
pub trait SelectionKind: Sized {
    /// Human readable name of the element kind.
    const NAME: &'static str;

    /// Returns `true` if nothing is selected.
    fn is_empty(&self) -> bool;

    /// Distinct vertex indices touched by the selection, ascending.
    fn vertex_indices(&self, mesh: &Mesh) -> Vec<usize>;

    /// Returns an error for any stale index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`].
    fn check(&self, mesh: &Mesh) -> Result<()>;

    /// Elements adjacent to at least one unselected element of this kind.
    fn perimeter(&self, mesh: &Mesh, adjacency: &Adjacency) -> Self;

    /// Every element of this kind not in the selection.
    fn invert(&self, mesh: &Mesh, adjacency: &Adjacency) -> Self;
}

/// Selected vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexSelection(pub Vec<usize>);

/// Selected edges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeSelection(pub Vec<Edge>);

/// Selected face indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FaceSelection(pub Vec<usize>);

impl SelectionKind for VertexSelection {
    const NAME: &'static str = "vertex";

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn vertex_indices(&self, _mesh: &Mesh) -> Vec<usize> {
        sorted(self.0.iter().copied())
    }

    fn check(&self, mesh: &Mesh) -> Result<()> {
        mesh.check_vertices(&self.0)
    }

    fn perimeter(&self, mesh: &Mesh, adjacency: &Adjacency) -> Self {
        Self(vertex_perimeter(mesh, adjacency, &self.0))
    }

    fn invert(&self, mesh: &Mesh, _adjacency: &Adjacency) -> Self {
        let groups: BTreeSet<usize> = mesh.shared_vertices().groups_of(&self.0).into_iter().collect();
        Self(
            (0..mesh.vertex_count())
                .filter(|&v| mesh.shared_vertices().group_of(v).is_some_and(|g| !groups.contains(&g)))
                .collect(),
        )
    }
}

impl SelectionKind for EdgeSelection {
    const NAME: &'static str = "edge";

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn vertex_indices(&self, _mesh: &Mesh) -> Vec<usize> {
        sorted(self.0.iter().flat_map(|e| [e.a, e.b]))
    }

    fn check(&self, mesh: &Mesh) -> Result<()> {
        for e in &self.0 {
            mesh.check_vertices(&[e.a, e.b])?;
        }
        Ok(())
    }

    fn perimeter(&self, _mesh: &Mesh, adjacency: &Adjacency) -> Self {
        Self(edge_perimeter(adjacency, &self.0))
    }

    fn invert(&self, _mesh: &Mesh, adjacency: &Adjacency) -> Self {
        let selected: BTreeSet<Edge> = self.0.iter().filter_map(|e| adjacency.common(e)).collect();
        Self(
            adjacency
                .edges()
                .filter(|(c, _)| !selected.contains(c))
                .filter_map(|(c, _)| adjacency.representative(c))
                .collect(),
        )
    }
}

impl SelectionKind for FaceSelection {
    const NAME: &'static str = "face";

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn vertex_indices(&self, mesh: &Mesh) -> Vec<usize> {
        sorted(
            self.0
                .iter()
                .filter_map(|&f| mesh.faces().get(f))
                .flat_map(|face| face.distinct_indices().iter().copied()),
        )
    }

    fn check(&self, mesh: &Mesh) -> Result<()> {
        mesh.check_faces(&self.0)
    }

    fn perimeter(&self, _mesh: &Mesh, adjacency: &Adjacency) -> Self {
        Self(face_perimeter(adjacency, &self.0))
    }

    fn invert(&self, mesh: &Mesh, _adjacency: &Adjacency) -> Self {
        let selected: BTreeSet<usize> = self.0.iter().copied().collect();
        Self((0..mesh.face_count()).filter(|f| !selected.contains(f)).collect())
    }
}

/// A selection of one element kind, as supplied by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Vertices(Vec<usize>),
    Edges(Vec<Edge>),
    Faces(Vec<usize>),
}

macro_rules! dispatch {
    ($self:expr, $sel:ident => $body:expr) => {
        match $self {
            Selection::Vertices(v) => {
                let $sel = VertexSelection(v.clone());
                $body
            }
            Selection::Edges(e) => {
                let $sel = EdgeSelection(e.clone());
                $body
            }
            Selection::Faces(f) => {
                let $sel = FaceSelection(f.clone());
                $body
            }
        }
    };
}

impl Selection {
    /// Name of the selected element kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Vertices(_) => VertexSelection::NAME,
            Self::Edges(_) => EdgeSelection::NAME,
            Self::Faces(_) => FaceSelection::NAME,
        }
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Vertices(v) | Self::Faces(v) => v.is_empty(),
            Self::Edges(e) => e.is_empty(),
        }
    }

    /// Distinct vertex indices touched by the selection, ascending.
    #[must_use]
    pub fn vertex_indices(&self, mesh: &Mesh) -> Vec<usize> {
        dispatch!(self, s => s.vertex_indices(mesh))
    }

    /// Returns an error for any stale index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`].
    pub fn check(&self, mesh: &Mesh) -> Result<()> {
        dispatch!(self, s => s.check(mesh))
    }

    /// Perimeter of the selection, of the same kind.
    #[must_use]
    pub fn perimeter(&self, mesh: &Mesh, adjacency: &Adjacency) -> Self {
        dispatch!(self, s => s.perimeter(mesh, adjacency).into())
    }

    /// Complement of the selection, of the same kind.
    #[must_use]
    pub fn invert(&self, mesh: &Mesh, adjacency: &Adjacency) -> Self {
        dispatch!(self, s => s.invert(mesh, adjacency).into())
    }
}

impl From<VertexSelection> for Selection {
    fn from(s: VertexSelection) -> Self {
        Self::Vertices(s.0)
    }
}

impl From<EdgeSelection> for Selection {
    fn from(s: EdgeSelection) -> Self {
        Self::Edges(s.0)
    }
}

impl From<FaceSelection> for Selection {
    fn from(s: FaceSelection) -> Self {
        Self::Faces(s.0)
    }
}

fn sorted(iter: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut out: Vec<usize> = iter.collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn invert_faces() {
        let cube = shapes::cube(1.0);
        let adjacency = Adjacency::new(&cube);
        let inverted = Selection::Faces(vec![0, 2]).invert(&cube, &adjacency);
        assert_eq!(inverted, Selection::Faces(vec![1, 3, 4, 5]));
    }

    #[test]
    fn invert_vertices_respects_welds() {
        let cube = shapes::cube(1.0);
        let adjacency = Adjacency::new(&cube);
        let Selection::Vertices(rest) = Selection::Vertices(vec![0]).invert(&cube, &adjacency) else {
            panic!("kind changed");
        };
        // The three records of corner 0 are excluded.
        assert_eq!(rest.len(), 21);
    }

    #[test]
    fn invert_edges_of_cube() {
        let cube = shapes::cube(1.0);
        let adjacency = Adjacency::new(&cube);
        let Selection::Edges(rest) = Selection::Edges(vec![Edge::new(0, 1)]).invert(&cube, &adjacency) else {
            panic!("kind changed");
        };
        assert_eq!(rest.len(), 11);
    }

    #[test]
    fn face_selection_vertex_indices() {
        let cube = shapes::cube(1.0);
        assert_eq!(Selection::Faces(vec![1]).vertex_indices(&cube), vec![4, 5, 6, 7]);
        assert_eq!(Selection::Edges(vec![Edge::new(3, 1)]).vertex_indices(&cube), vec![1, 3]);
        assert_eq!(Selection::Faces(vec![]).kind_name(), "face");
    }
}
