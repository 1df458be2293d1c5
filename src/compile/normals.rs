use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::math::{try_normalize, Vector3};
use crate::mesh::{Face, Mesh};

/// Which normal a face corner takes: its own face normal, or the normal
/// smoothed over every face of a smoothing group around the corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum SmoothKey {
    Hard(usize),
    Smooth(u32),
}

impl SmoothKey {
    pub(super) fn of(f: usize, face: &Face) -> Self {
        match face.smoothing_group {
            0 => Self::Hard(f),
            group => Self::Smooth(group),
        }
    }
}

/// Normal of every `(vertex, key)` corner used by a face.
pub(super) fn corner_normals(mesh: &Mesh) -> Result<BTreeMap<(usize, SmoothKey), Vector3>> {
    let face_normals = (0..mesh.face_count())
        .map(|f| mesh.face_normal(f))
        .collect::<Result<Vec<_>>>()?;
    let lookup = mesh.shared_vertices().lookup();

    // Summed normals per (position group, smoothing group).
    let mut sums: BTreeMap<(usize, u32), Vector3> = BTreeMap::new();
    for (f, face) in mesh.faces().iter().enumerate() {
        if face.smoothing_group == 0 {
            continue;
        }
        let groups: BTreeSet<usize> = face
            .distinct_indices()
            .iter()
            .filter_map(|&v| lookup.get(v).copied())
            .collect();
        for g in groups {
            *sums
                .entry((g, face.smoothing_group))
                .or_insert_with(Vector3::zeros) += face_normals[f];
        }
    }

    let mut out = BTreeMap::new();
    for (f, face) in mesh.faces().iter().enumerate() {
        let key = SmoothKey::of(f, face);
        for &v in face.distinct_indices() {
            let normal = match key {
                SmoothKey::Hard(_) => face_normals[f],
                SmoothKey::Smooth(s) => lookup
                    .get(v)
                    .and_then(|&g| sums.get(&(g, s)))
                    .and_then(try_normalize)
                    .unwrap_or(face_normals[f]),
            };
            out.insert((v, key), normal);
        }
    }
    Ok(out)
}

/// Rewrites every vertex normal from the face normals.
///
/// Corners of hard faces (smoothing group 0) take their face normal; other
/// corners average the normals of every face in the same smoothing group
/// around their position group. A vertex record shared by faces of
/// different keys keeps the normal of the first face using it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecomputeNormals;

impl RecomputeNormals {
    /// Creates a new `RecomputeNormals` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the recomputation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] if a face holds a
    /// stale vertex index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        let corners = corner_normals(mesh)?;
        let mut written = vec![false; mesh.vertex_count()];
        let keys: Vec<(usize, SmoothKey)> = mesh
            .faces()
            .iter()
            .enumerate()
            .flat_map(|(f, face)| {
                let key = SmoothKey::of(f, face);
                face.distinct_indices().iter().map(move |&v| (v, key))
            })
            .collect();
        let vertices = mesh.vertices_mut();
        for (v, key) in keys {
            if written[v] {
                continue;
            }
            if let Some(normal) = corners.get(&(v, key)) {
                vertices[v].normal = *normal;
                written[v] = true;
            }
        }
        debug!(vertices = written.iter().filter(|w| **w).count(), "recomputed normals");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn hard_faces_keep_face_normal() {
        let mut cube = shapes::cube(1.0);
        RecomputeNormals::new().execute(&mut cube).unwrap();
        assert_relative_eq!(cube.vertices()[0].normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(cube.vertices()[13].normal, -Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn smoothing_group_averages_around_corner() {
        let mut cube = shapes::cube(1.0);
        for f in 0..6 {
            cube.face_mut(f).unwrap().smoothing_group = 1;
        }
        RecomputeNormals::new().execute(&mut cube).unwrap();
        let expected = Vector3::new(-1.0, -1.0, 1.0).normalize();
        for v in [0, 13, 23] {
            assert_relative_eq!(cube.vertices()[v].normal, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn different_groups_do_not_blend() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(0).unwrap().smoothing_group = 1;
        cube.face_mut(3).unwrap().smoothing_group = 2;
        RecomputeNormals::new().execute(&mut cube).unwrap();
        assert_relative_eq!(cube.vertices()[0].normal, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(cube.vertices()[13].normal, -Vector3::x(), epsilon = 1e-12);
    }
}
