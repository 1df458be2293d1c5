use tracing::info;

use crate::error::{Declined, Outcome, Result};
use crate::mesh::Mesh;
use crate::uv::RefreshAutoUvs;

use super::{distinct, transact};

/// Reverses the winding of faces so their normals point the other way.
#[derive(Debug, Clone)]
pub struct FlipNormals {
    faces: Vec<usize>,
}

impl FlipNormals {
    /// Creates a new `FlipNormals` operation.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: distinct(faces),
        }
    }

    /// Executes the flip and returns the flipped faces.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<usize>>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            for &f in &self.faces {
                work.face_mut(f)?.reverse();
            }
            RefreshAutoUvs::new().execute(work)?;
            info!(faces = self.faces.len(), "flip normals");
            Ok(Outcome::Applied(self.faces.clone()))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Vector3;
    use crate::mesh::shapes;

    #[test]
    fn flip_points_normal_inward() {
        let mut cube = shapes::cube(1.0);
        let _ = FlipNormals::new(&[0]).execute(&mut cube).unwrap();
        assert_relative_eq!(cube.face_normal(0).unwrap(), -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(cube.face_normal(1).unwrap(), -Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn double_flip_restores_winding() {
        let mut cube = shapes::cube(1.0);
        let before = cube.faces()[2].indices().to_vec();
        let _ = FlipNormals::new(&[2]).execute(&mut cube).unwrap();
        let _ = FlipNormals::new(&[2]).execute(&mut cube).unwrap();
        assert_eq!(cube.faces()[2].indices(), before.as_slice());
    }

    #[test]
    fn empty_flip_declines() {
        let mut cube = shapes::cube(1.0);
        let outcome = FlipNormals::new(&[]).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::EmptySelection));
    }
}
