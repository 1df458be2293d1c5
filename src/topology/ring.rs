use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::mesh::{Edge, Mesh};

use super::{collect_edges, Adjacency};

/// Extends each selected edge across quads to the opposite edge, in both
/// directions, until a boundary, a non-manifold edge, a non-quad face or an
/// already visited edge stops the walk.
#[derive(Debug, Clone)]
pub struct EdgeRing {
    edges: Vec<Edge>,
}

impl EdgeRing {
    /// Creates a new `EdgeRing` query.
    #[must_use]
    pub fn new(edges: &[Edge]) -> Self {
        Self {
            edges: edges.to_vec(),
        }
    }

    /// Executes the query. The result starts with the input edges, followed
    /// by the edges reached, in ascending common-edge order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] if an edge
    /// endpoint is stale.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<Edge>> {
        let adjacency = Adjacency::new(mesh);
        self.execute_with(mesh, &adjacency)
    }

    /// Executes the query against prebuilt adjacency.
    ///
    /// # Errors
    ///
    /// As [`EdgeRing::execute`].
    pub fn execute_with(&self, mesh: &Mesh, adjacency: &Adjacency) -> Result<Vec<Edge>> {
        let mut visited = BTreeSet::new();
        for edge in &self.edges {
            mesh.check_vertices(&[edge.a, edge.b])?;
            if let Some(common) = adjacency.common(edge) {
                visited.insert(common);
            }
        }
        let starts: Vec<Edge> = visited.iter().copied().collect();
        for start in starts {
            let faces = adjacency.faces_of_edge(&start);
            if faces.len() > 2 {
                continue;
            }
            for &face in faces {
                walk(adjacency, start, face, &mut visited);
            }
        }
        let out = collect_edges(adjacency, &self.edges, &visited);
        debug!(input = self.edges.len(), found = out.len(), "edge ring");
        Ok(out)
    }
}

fn walk(adjacency: &Adjacency, start: Edge, first_face: usize, visited: &mut BTreeSet<Edge>) {
    let mut edge = start;
    let mut face = first_face;
    loop {
        let edges = adjacency.face_edges(face);
        if edges.len() != 4 {
            return;
        }
        let Some(i) = edges.iter().position(|(_, c)| *c == edge) else {
            return;
        };
        let opposite = edges[(i + 2) % 4].1;
        if !visited.insert(opposite) {
            return;
        }
        let faces = adjacency.faces_of_edge(&opposite);
        if faces.len() != 2 {
            return;
        }
        face = if faces[0] == face { faces[1] } else { faces[0] };
        edge = opposite;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn cube_ring_wraps_around() {
        let cube = shapes::cube(1.0);
        // Bottom edge of the +Z side.
        let ring = EdgeRing::new(&[Edge::new(0, 1)]).execute(&cube).unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], Edge::new(0, 1));
    }

    #[test]
    fn grid_ring_stops_at_boundary() {
        let plane = shapes::plane(3.0, 3.0, 3, 1);
        // Shared edge between quad 0 and quad 1: vertices 1 and 2 of quad 0.
        let ring = EdgeRing::new(&[Edge::new(1, 2)]).execute(&plane).unwrap();
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn triangle_does_not_extend() {
        let mesh = Mesh::new(
            vec![crate::mesh::Vertex::default(); 3],
            vec![crate::mesh::Face::triangle(0, 1, 2)],
        );
        let ring = EdgeRing::new(&[Edge::new(0, 1)]).execute(&mesh).unwrap();
        assert_eq!(ring, vec![Edge::new(0, 1)]);
    }
}
