use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::Result;
use crate::math::{best_fit_normal, newell_normal, triangle_normal, try_normalize, Point3, Vector3};
use crate::mesh::{AutoUnwrapSettings, Mesh};

use super::project::{apply_settings, planar};

/// Re-projects the primary UVs of every auto-UV face.
///
/// Ungrouped faces are projected on their own plane. Faces sharing a
/// positive texture group are projected together on the best-fit plane of
/// all their vertices, with the settings of the group's first face.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshAutoUvs;

impl RefreshAutoUvs {
    /// Creates a new `RefreshAutoUvs` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the refresh. Manual faces are never touched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] if a face holds a
    /// stale vertex index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        let mut grouped: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        let mut single = Vec::new();
        for (f, face) in mesh.faces().iter().enumerate() {
            if face.manual_uv {
                continue;
            }
            if face.texture_group > 0 {
                grouped.entry(face.texture_group).or_default().push(f);
            } else {
                single.push(f);
            }
        }
        let local = mesh.positions();
        let world = mesh.world_positions();
        for f in single {
            project_group(mesh, &[f], &local, &world)?;
        }
        for faces in grouped.values() {
            project_group(mesh, faces, &local, &world)?;
        }
        debug!(faces = mesh.face_count(), "refreshed auto uvs");
        Ok(())
    }
}

fn project_group(mesh: &mut Mesh, faces: &[usize], local: &[Point3], world: &[Point3]) -> Result<()> {
    let Some(&first) = faces.first() else {
        return Ok(());
    };
    let settings: AutoUnwrapSettings = mesh.face(first)?.uv;
    let positions = if settings.use_world_space { world } else { local };

    let mut indices: Vec<usize> = faces
        .iter()
        .flat_map(|&f| mesh.faces()[f].distinct_indices().iter().copied())
        .collect();
    indices.sort_unstable();
    indices.dedup();
    mesh.check_vertices(&indices)?;

    let Some(normal) = group_normal(mesh, faces, positions) else {
        warn!(face = first, "skipping auto uv projection of a degenerate face");
        return Ok(());
    };
    let points: Vec<Point3> = indices.iter().map(|&i| positions[i]).collect();
    let mut uvs = planar(&points, &normal);
    apply_settings(&mut uvs, &settings);
    let vertices = mesh.vertices_mut();
    for (&i, uv) in indices.iter().zip(&uvs) {
        vertices[i].uv0 = uv.coords;
    }
    Ok(())
}

/// Projection normal: the face normal for one face, the best-fit plane
/// normal oriented along the summed face normals for several.
pub(crate) fn group_normal(mesh: &Mesh, faces: &[usize], positions: &[Point3]) -> Option<Vector3> {
    let mut sum = Vector3::zeros();
    for &f in faces {
        sum += face_normal_in(mesh, f, positions)?;
    }
    let average = try_normalize(&sum);
    if faces.len() == 1 {
        return average;
    }
    let mut points: Vec<Point3> = faces
        .iter()
        .filter_map(|&f| mesh.faces().get(f))
        .flat_map(|face| face.distinct_indices().iter().filter_map(|&i| positions.get(i).copied()))
        .collect();
    points.dedup();
    match (best_fit_normal(&points), average) {
        (Some(fit), Some(avg)) => Some(if fit.dot(&avg) < 0.0 { -fit } else { fit }),
        (Some(fit), None) => Some(fit),
        (None, avg) => avg,
    }
}

/// Unit normal of a face over an arbitrary position array.
pub(crate) fn face_normal_in(mesh: &Mesh, face: usize, positions: &[Point3]) -> Option<Vector3> {
    let face = mesh.faces().get(face)?;
    if let Some(ring) = face.perimeter() {
        let points: Option<Vec<Point3>> = ring.iter().map(|&i| positions.get(i).copied()).collect();
        if let Some(n) = points.as_deref().and_then(newell_normal) {
            return Some(n);
        }
    }
    let mut sum = Vector3::zeros();
    for [a, b, c] in face.triangles() {
        sum += triangle_normal(positions.get(a)?, positions.get(b)?, positions.get(c)?);
    }
    try_normalize(&sum).or(Some(Vector3::zeros()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{Matrix4, Vector2};
    use crate::mesh::shapes;

    #[test]
    fn plane_uvs_follow_world_xz() {
        let mut plane = shapes::plane(2.0, 2.0, 1, 1);
        RefreshAutoUvs::new().execute(&mut plane).unwrap();
        let v = plane.vertices();
        // Adjacent corners are one unit apart in UV space per world unit.
        assert_relative_eq!((v[1].uv0 - v[0].uv0).norm(), 2.0, epsilon = 1e-9);
        assert_relative_eq!((v[3].uv0 - v[0].uv0).norm(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn manual_faces_keep_their_uvs() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(0).unwrap().manual_uv = true;
        cube.vertices_mut()[0].uv0 = Vector2::new(7.0, 7.0);
        RefreshAutoUvs::new().execute(&mut cube).unwrap();
        assert_eq!(cube.vertices()[0].uv0, Vector2::new(7.0, 7.0));
    }

    #[test]
    fn grouped_faces_share_one_plane() {
        let mut plane = shapes::plane(2.0, 1.0, 2, 1);
        for f in 0..2 {
            plane.face_mut(f).unwrap().texture_group = 1;
        }
        RefreshAutoUvs::new().execute(&mut plane).unwrap();
        // Coincident corners on the seam receive equal UVs.
        let v = plane.vertices();
        assert_relative_eq!(v[1].uv0, v[4].uv0, epsilon = 1e-9);
        assert_relative_eq!(v[2].uv0, v[7].uv0, epsilon = 1e-9);
    }

    #[test]
    fn world_space_projection_uses_transform() {
        let mut plane = shapes::plane(1.0, 1.0, 1, 1);
        plane.face_mut(0).unwrap().uv.use_world_space = true;
        plane.transform = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        RefreshAutoUvs::new().execute(&mut plane).unwrap();
        let mut local = plane.clone();
        local.face_mut(0).unwrap().uv.use_world_space = false;
        RefreshAutoUvs::new().execute(&mut local).unwrap();
        let shift = plane.vertices()[0].uv0 - local.vertices()[0].uv0;
        assert_relative_eq!(shift.norm(), 10.0, epsilon = 1e-9);
    }
}
