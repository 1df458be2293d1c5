use tracing::{debug, info};

use crate::error::{Declined, OperationError, Outcome, Result};
use crate::math::{try_normalize, Matrix3};
use crate::mesh::Mesh;

/// Merges several meshes into one.
///
/// Vertices are moved into the local space of the first mesh. Faces whose
/// auto UVs were projected in local space become manual so the merge does
/// not change their UVs. Texture and element groups are offset so groups of
/// different inputs never collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombineMeshes;

impl CombineMeshes {
    /// Creates a new `CombineMeshes` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the merge and returns the combined mesh. The inputs are left
    /// untouched.
    ///
    /// Declines with [`Declined::NotEnoughMeshes`] for fewer than two meshes.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the first mesh's transform
    /// is not invertible.
    pub fn execute(&self, meshes: &[Mesh]) -> Result<Outcome<Mesh>> {
        let [first, rest @ ..] = meshes else {
            return Ok(Declined::NotEnoughMeshes.into());
        };
        if rest.is_empty() {
            return Ok(Declined::NotEnoughMeshes.into());
        }
        let Some(to_first) = first.transform.try_inverse() else {
            let reason = "first mesh transform is singular".to_owned();
            return Err(OperationError::InvalidInput(reason).into());
        };

        let mut combined = first.clone();
        for mesh in rest {
            let mut part = mesh.clone();
            let local = to_first * mesh.transform;
            let linear: Matrix3 = local.fixed_view::<3, 3>(0, 0).into_owned();
            // Inverse transpose keeps normals perpendicular to scaled surfaces.
            let normal_matrix = linear.try_inverse().map_or(linear, |m| m.transpose());
            for vertex in part.vertices_mut() {
                vertex.position = local.transform_point(&vertex.position);
                if let Some(normal) = try_normalize(&(normal_matrix * vertex.normal)) {
                    vertex.normal = normal;
                }
            }

            let texture_offset = combined.unused_texture_group() - 1;
            let element_offset = combined.unused_element_group();
            for f in 0..part.face_count() {
                let face = part.face_mut(f)?;
                if !face.manual_uv && !face.uv.use_world_space {
                    face.manual_uv = true;
                }
                if face.texture_group > 0 {
                    face.texture_group += texture_offset;
                }
                if face.element_group >= 0 {
                    face.element_group += element_offset;
                }
            }
            let offset = combined.append(&part);
            debug!(offset, faces = part.face_count(), "appended mesh");
        }
        info!(meshes = meshes.len(), faces = combined.face_count(), "combine meshes");
        Ok(Outcome::Applied(combined))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{Matrix4, Point3, Vector3};
    use crate::mesh::shapes;
    use crate::PolyweldError;

    #[test]
    fn second_mesh_lands_in_first_space() {
        let mut a = shapes::cube(1.0);
        a.transform = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0));
        let mut b = shapes::cube(1.0);
        b.transform = Matrix4::new_translation(&Vector3::new(4.0, 0.0, 0.0));

        let combined = CombineMeshes::new().execute(&[a, b]).unwrap().applied().unwrap();
        assert_eq!(combined.vertex_count(), 48);
        assert_eq!(combined.face_count(), 12);
        assert_eq!(combined.shared_vertices().len(), 16);
        assert_relative_eq!(
            combined.vertices()[24].position,
            Point3::new(2.5, -0.5, 0.5),
            epsilon = 1e-12
        );
        assert!(combined.faces()[6..].iter().all(|f| f.manual_uv));
        assert!(combined.faces()[..6].iter().all(|f| !f.manual_uv));
        combined.validate().unwrap();
    }

    #[test]
    fn normals_survive_non_uniform_scale() {
        let a = shapes::cube(1.0);
        let mut b = shapes::cube(1.0);
        b.transform = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        b.vertices_mut()[0].normal = Vector3::new(1.0, 1.0, 0.0).normalize();

        let combined = CombineMeshes::new().execute(&[a, b]).unwrap().applied().unwrap();
        let expected = Vector3::new(1.0, 2.0, 0.0).normalize();
        assert_relative_eq!(combined.vertices()[24].normal, expected, epsilon = 1e-12);
    }

    #[test]
    fn groups_do_not_collide() {
        let mut a = shapes::plane(1.0, 1.0, 1, 1);
        a.face_mut(0).unwrap().texture_group = 2;
        a.face_mut(0).unwrap().element_group = 0;
        let mut b = shapes::plane(1.0, 1.0, 1, 1);
        b.face_mut(0).unwrap().texture_group = 1;
        b.face_mut(0).unwrap().element_group = 0;

        let combined = CombineMeshes::new().execute(&[a, b]).unwrap().applied().unwrap();
        assert_eq!(combined.faces()[1].texture_group, 3);
        assert_eq!(combined.faces()[1].element_group, 1);
    }

    #[test]
    fn single_mesh_declines() {
        let outcome = CombineMeshes::new().execute(&[shapes::cube(1.0)]).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NotEnoughMeshes));
    }

    #[test]
    fn singular_transform_is_rejected() {
        let mut a = shapes::cube(1.0);
        a.transform = Matrix4::zeros();
        let result = CombineMeshes::new().execute(&[a, shapes::cube(1.0)]);
        assert!(matches!(result, Err(PolyweldError::Operation(OperationError::InvalidInput(_)))));
    }
}
