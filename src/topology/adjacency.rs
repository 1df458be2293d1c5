use std::collections::BTreeMap;

use crate::mesh::{Edge, Mesh};

/// Edge and face adjacency of a mesh, computed in position-group space so
/// that welded seams count as connected.
///
/// Built on demand from a [`Mesh`]; it is a snapshot and goes stale as soon
/// as the mesh is mutated.
#[derive(Debug, Clone)]
pub struct Adjacency {
    lookup: Vec<usize>,
    /// Common edge to the faces bordering it, ascending.
    edge_faces: BTreeMap<Edge, Vec<usize>>,
    /// Per face, perimeter edges in winding order as `(local, common)`.
    face_edges: Vec<Vec<(Edge, Edge)>>,
    /// Common group to the common edges meeting there.
    group_edges: BTreeMap<usize, Vec<Edge>>,
    /// Common group to the faces touching it, ascending.
    group_faces: Vec<Vec<usize>>,
}

impl Adjacency {
    /// Builds adjacency for `mesh`. Indices outside the partition are
    /// skipped; run [`Mesh::validate`] first when that matters.
    #[must_use]
    pub fn new(mesh: &Mesh) -> Self {
        let lookup = mesh.common_lookup().to_vec();
        let mut edge_faces: BTreeMap<Edge, Vec<usize>> = BTreeMap::new();
        let mut group_edges: BTreeMap<usize, Vec<Edge>> = BTreeMap::new();
        let mut group_faces = vec![Vec::new(); mesh.shared_vertices().len()];
        let mut face_edges = Vec::with_capacity(mesh.face_count());

        for (f, face) in mesh.faces().iter().enumerate() {
            let mut edges = Vec::new();
            for local in face.edges() {
                let Some(common) = local.to_common(&lookup) else {
                    continue;
                };
                if common.is_degenerate() {
                    continue;
                }
                let faces = edge_faces.entry(common).or_default();
                if faces.last() != Some(&f) {
                    faces.push(f);
                }
                edges.push((local, common));
            }
            for &v in face.distinct_indices() {
                if let Some(list) = lookup.get(v).and_then(|&g| group_faces.get_mut(g)) {
                    if list.last() != Some(&f) {
                        list.push(f);
                    }
                }
            }
            face_edges.push(edges);
        }
        for common in edge_faces.keys() {
            group_edges.entry(common.a).or_default().push(*common);
            group_edges.entry(common.b).or_default().push(*common);
        }

        Self {
            lookup,
            edge_faces,
            face_edges,
            group_edges,
            group_faces,
        }
    }

    /// The edge in group space.
    #[must_use]
    pub fn common(&self, edge: &Edge) -> Option<Edge> {
        edge.to_common(&self.lookup)
    }

    /// Group id of vertex `v`.
    #[must_use]
    pub fn group_of(&self, v: usize) -> Option<usize> {
        self.lookup.get(v).copied()
    }

    /// Faces bordering a common edge.
    #[must_use]
    pub fn faces_of_edge(&self, common: &Edge) -> &[usize] {
        self.edge_faces.get(common).map_or(&[], Vec::as_slice)
    }

    /// Faces bordering a local edge.
    #[must_use]
    pub fn faces_of_local_edge(&self, edge: &Edge) -> &[usize] {
        self.common(edge).map_or(&[], |c| self.faces_of_edge(&c))
    }

    /// Perimeter edges of face `f` as `(local, common)` pairs, in winding
    /// order.
    #[must_use]
    pub fn face_edges(&self, f: usize) -> &[(Edge, Edge)] {
        self.face_edges.get(f).map_or(&[], Vec::as_slice)
    }

    /// Common edges meeting at group `g`.
    #[must_use]
    pub fn spokes(&self, g: usize) -> &[Edge] {
        self.group_edges.get(&g).map_or(&[], Vec::as_slice)
    }

    /// Faces touching group `g`.
    #[must_use]
    pub fn faces_of_group(&self, g: usize) -> &[usize] {
        self.group_faces.get(g).map_or(&[], Vec::as_slice)
    }

    /// Faces touching vertex `v` or anything welded to it.
    #[must_use]
    pub fn faces_of_vertex(&self, v: usize) -> &[usize] {
        self.group_of(v).map_or(&[], |g| self.faces_of_group(g))
    }

    /// Every common edge with its faces, in ascending edge order.
    pub fn edges(&self) -> impl Iterator<Item = (&Edge, &[usize])> {
        self.edge_faces.iter().map(|(e, f)| (e, f.as_slice()))
    }

    /// The local edge of face `f` matching `common`, oriented along the face
    /// winding.
    #[must_use]
    pub fn local_edge(&self, f: usize, common: &Edge) -> Option<Edge> {
        self.face_edges(f)
            .iter()
            .find(|(_, c)| c == common)
            .map(|(l, _)| *l)
    }

    /// A local representative of `common`, taken from its lowest face.
    #[must_use]
    pub fn representative(&self, common: &Edge) -> Option<Edge> {
        let f = *self.faces_of_edge(common).first()?;
        self.local_edge(f, common)
    }

    /// Returns `true` if the common edge borders exactly one face.
    #[must_use]
    pub fn is_boundary(&self, common: &Edge) -> bool {
        self.faces_of_edge(common).len() == 1
    }
}
