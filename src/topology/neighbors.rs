use crate::error::Result;
use crate::mesh::Mesh;

use super::Adjacency;

#[derive(Debug, Clone)]
enum Seed {
    Faces(Vec<usize>),
    Vertices(Vec<usize>),
}

/// Finds every face sharing at least one position group with the input.
///
/// The input faces themselves are part of the result, which is ascending.
#[derive(Debug, Clone)]
pub struct NeighborFaces {
    seed: Seed,
}

impl NeighborFaces {
    /// Neighbors of a single face.
    #[must_use]
    pub fn of_face(face: usize) -> Self {
        Self {
            seed: Seed::Faces(vec![face]),
        }
    }

    /// Neighbors of a face set.
    #[must_use]
    pub fn of_faces(faces: &[usize]) -> Self {
        Self {
            seed: Seed::Faces(faces.to_vec()),
        }
    }

    /// Faces touching any group of the given vertices.
    #[must_use]
    pub fn of_vertices(vertices: &[usize]) -> Self {
        Self {
            seed: Seed::Vertices(vertices.to_vec()),
        }
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face
    /// or vertex index.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<usize>> {
        let adjacency = Adjacency::new(mesh);
        self.execute_with(mesh, &adjacency)
    }

    /// Executes the query against prebuilt adjacency.
    ///
    /// # Errors
    ///
    /// As [`NeighborFaces::execute`].
    pub fn execute_with(&self, mesh: &Mesh, adjacency: &Adjacency) -> Result<Vec<usize>> {
        let (mut out, vertices) = match &self.seed {
            Seed::Faces(faces) => {
                mesh.check_faces(faces)?;
                let vertices = faces
                    .iter()
                    .flat_map(|&f| mesh.faces()[f].distinct_indices().iter().copied())
                    .collect::<Vec<_>>();
                (faces.clone(), vertices)
            }
            Seed::Vertices(vertices) => {
                mesh.check_vertices(vertices)?;
                (Vec::new(), vertices.clone())
            }
        };
        for g in mesh.shared_vertices().groups_of(&vertices) {
            out.extend_from_slice(adjacency.faces_of_group(g));
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }
}
