use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{Declined, Outcome, Result};
use crate::math::{centroid, Point2, Point3, ProjectionAxis, Vector3};
use crate::mesh::{AutoUnwrapSettings, Fill, Mesh};
use crate::operations::transact;

use super::auto::{face_normal_in, group_normal};
use super::project::{apply_settings, channel_mut, planar, spherical};

/// Planar projection of a face set onto one shared plane.
///
/// A single face uses its own normal; several faces use the best-fit plane
/// of all their vertices. Projected faces become manual and leave their
/// texture groups. With `use_world_space` set the plane is fitted to the
/// world-transformed positions.
#[derive(Debug, Clone)]
pub struct PlanarProject {
    faces: Vec<usize>,
    channel: usize,
    settings: AutoUnwrapSettings,
}

impl PlanarProject {
    /// Creates a new `PlanarProject` operation writing the primary channel.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
            channel: 0,
            settings: AutoUnwrapSettings::tile(),
        }
    }

    /// Writes UV channel `channel` (0 primary, 1 lightmap).
    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Settings applied to the projected coordinates.
    #[must_use]
    pub fn with_settings(mut self, settings: AutoUnwrapSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fits the result into the unit square.
    #[must_use]
    pub fn fitted(mut self, fit: bool) -> Self {
        self.settings.fill = if fit { Fill::Fit } else { Fill::Tile };
        self
    }

    /// Executes the projection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face
    /// and [`crate::error::ProjectionError::InvalidChannel`] for a channel
    /// other than 0 or 1.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            let positions = if self.settings.use_world_space {
                work.world_positions()
            } else {
                work.positions()
            };
            let Some(normal) = group_normal(work, &self.faces, &positions) else {
                warn!(faces = self.faces.len(), "planar projection plane is degenerate");
                return Ok(Declined::NothingToDo.into());
            };
            project_faces(work, &self.faces, &positions, self.channel, &self.settings, |points| {
                planar(points, &normal)
            })?;
            info!(faces = self.faces.len(), "planar projection");
            Ok(Outcome::Applied(()))
        })
    }
}

/// Box projection: faces are grouped by the dominant axis of their normal
/// and each group is projected along that axis.
#[derive(Debug, Clone)]
pub struct BoxProject {
    faces: Vec<usize>,
    channel: usize,
}

impl BoxProject {
    /// Creates a new `BoxProject` operation writing the primary channel.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
            channel: 0,
        }
    }

    /// Writes UV channel `channel` (0 primary, 1 lightmap).
    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Executes the projection.
    ///
    /// # Errors
    ///
    /// As [`PlanarProject::execute`].
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            let positions = work.positions();
            let mut by_axis: BTreeMap<ProjectionAxis, Vec<usize>> = BTreeMap::new();
            for &f in &self.faces {
                let normal = face_normal_in(work, f, &positions).unwrap_or_else(Vector3::zeros);
                by_axis
                    .entry(ProjectionAxis::from_direction(&normal))
                    .or_default()
                    .push(f);
            }
            let settings = AutoUnwrapSettings::tile();
            for (axis, faces) in &by_axis {
                let normal = axis.vector();
                project_faces(work, faces, &positions, self.channel, &settings, |points| {
                    planar(points, &normal)
                })?;
            }
            info!(faces = self.faces.len(), axes = by_axis.len(), "box projection");
            Ok(Outcome::Applied(()))
        })
    }
}

/// Spherical projection around the centroid of the selected vertices.
#[derive(Debug, Clone)]
pub struct SphericalProject {
    faces: Vec<usize>,
    channel: usize,
}

impl SphericalProject {
    /// Creates a new `SphericalProject` operation writing the primary channel.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
            channel: 0,
        }
    }

    /// Writes UV channel `channel` (0 primary, 1 lightmap).
    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Executes the projection.
    ///
    /// # Errors
    ///
    /// As [`PlanarProject::execute`].
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            let indices = face_vertices(work, &self.faces);
            work.check_vertices(&indices)?;
            let positions = work.positions();
            let points: Vec<Point3> = indices.iter().map(|&i| positions[i]).collect();
            let Some(center) = centroid(&points) else {
                return Ok(Declined::NothingToDo.into());
            };
            let settings = AutoUnwrapSettings::tile();
            project_faces(work, &self.faces, &positions, self.channel, &settings, |points| {
                spherical(points, &center)
            })?;
            info!(faces = self.faces.len(), "spherical projection");
            Ok(Outcome::Applied(()))
        })
    }
}

/// Distinct vertices of a face set, ascending.
pub(crate) fn face_vertices(mesh: &Mesh, faces: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = faces
        .iter()
        .filter_map(|&f| mesh.faces().get(f))
        .flat_map(|face| face.distinct_indices().iter().copied())
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Writes projected coordinates for the vertices of `faces` and marks the
/// faces manual, outside their texture groups and UV welds.
///
/// `positions` holds one point per vertex, in the space being projected.
fn project_faces(
    mesh: &mut Mesh,
    faces: &[usize],
    positions: &[Point3],
    channel: usize,
    settings: &AutoUnwrapSettings,
    project: impl Fn(&[Point3]) -> Vec<Point2>,
) -> Result<()> {
    let indices = face_vertices(mesh, faces);
    mesh.check_vertices(&indices)?;
    let points: Vec<Point3> = indices.iter().map(|&i| positions[i]).collect();
    let mut uvs = project(&points);
    apply_settings(&mut uvs, settings);
    for (&i, uv) in indices.iter().zip(&uvs) {
        *channel_mut(&mut mesh.vertices_mut()[i], channel)? = uv.coords;
    }
    for &f in faces {
        let face = mesh.face_mut(f)?;
        face.manual_uv = true;
        face.texture_group = -1;
    }
    for &i in &indices {
        mesh.shared_textures_mut().detach(i);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{Matrix4, Vector2};
    use crate::mesh::shapes;

    #[test]
    fn planar_projection_makes_faces_manual() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(0).unwrap().texture_group = 2;
        let outcome = PlanarProject::new(&[0]).execute(&mut cube).unwrap();
        assert!(outcome.is_applied());
        let face = &cube.faces()[0];
        assert!(face.manual_uv);
        assert_eq!(face.texture_group, -1);
    }

    #[test]
    fn fitted_planar_projection_is_unit_bounded() {
        let mut plane = shapes::plane(4.0, 2.0, 2, 1);
        let _ = PlanarProject::new(&[0, 1]).fitted(true).execute(&mut plane).unwrap();
        let max = plane
            .vertices()
            .iter()
            .fold(Vector2::zeros(), |m, v| m.sup(&v.uv0));
        assert_relative_eq!(max.x.max(max.y), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn world_space_projection_follows_transform() {
        let mut local = shapes::plane(1.0, 1.0, 1, 1);
        local.transform = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        let mut world = local.clone();
        let settings = AutoUnwrapSettings {
            use_world_space: true,
            ..AutoUnwrapSettings::tile()
        };
        let _ = PlanarProject::new(&[0]).execute(&mut local).unwrap();
        let _ = PlanarProject::new(&[0]).with_settings(settings).execute(&mut world).unwrap();
        for (l, w) in local.vertices().iter().zip(world.vertices()) {
            assert_relative_eq!((w.uv0 - l.uv0).norm(), 10.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn box_projection_groups_cube_sides() {
        let mut cube = shapes::cube(2.0);
        let outcome = BoxProject::new(&[0, 1, 2, 3, 4, 5]).execute(&mut cube).unwrap();
        assert!(outcome.is_applied());
        // Each side spans two units in UV space.
        let v = cube.vertices();
        assert_relative_eq!((v[1].uv0 - v[0].uv0).norm(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_channel_leaves_mesh_untouched() {
        let mut cube = shapes::cube(1.0);
        let before = cube.clone();
        assert!(PlanarProject::new(&[0]).with_channel(3).execute(&mut cube).is_err());
        assert_eq!(cube, before);
    }

    #[test]
    fn spherical_projection_stays_in_unit_range() {
        let mut cube = shapes::cube(1.0);
        let _ = SphericalProject::new(&[0, 1, 2, 3, 4, 5]).execute(&mut cube).unwrap();
        for v in cube.vertices() {
            assert!((0.0..=1.0).contains(&v.uv0.x));
            assert!((0.0..=1.0).contains(&v.uv0.y));
        }
    }
}
