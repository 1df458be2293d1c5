use tracing::info;

use crate::error::{Declined, Outcome, Result};
use crate::math::{Matrix4, Point3, Vector3, TOLERANCE};
use crate::mesh::Mesh;
use crate::uv::RefreshAutoUvs;

use super::{distinct, transact};

/// Moves the pivot of a mesh to the bounds center of a vertex set, or of
/// every vertex when the set is empty.
///
/// Vertices shift by the opposite offset and the transform absorbs it, so
/// world positions do not change. Auto UVs are re-projected afterwards.
#[derive(Debug, Clone)]
pub struct SetPivot {
    vertices: Vec<usize>,
}

impl SetPivot {
    /// Creates a new `SetPivot` operation.
    #[must_use]
    pub fn new(vertices: &[usize]) -> Self {
        Self {
            vertices: distinct(vertices),
        }
    }

    /// Executes the move and returns the local offset of the new pivot.
    ///
    /// Declines with [`Declined::NothingToDo`] when the pivot already sits
    /// at the center, or the mesh has no vertices.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vector3>> {
        mesh.check_vertices(&self.vertices)?;
        let positions = mesh.positions();
        let points: Vec<Point3> = if self.vertices.is_empty() {
            positions
        } else {
            self.vertices.iter().map(|&v| positions[v]).collect()
        };
        let Some(offset) = bounds_center(&points).map(|c| c.coords) else {
            return Ok(Declined::NothingToDo.into());
        };
        if offset.norm() < TOLERANCE {
            return Ok(Declined::NothingToDo.into());
        }
        transact(mesh, |work| {
            let shifted: Vec<Point3> = work.positions().iter().map(|p| p - offset).collect();
            work.set_positions(&shifted)?;
            work.transform *= Matrix4::new_translation(&offset);
            RefreshAutoUvs::new().execute(work)?;
            info!(x = offset.x, y = offset.y, z = offset.z, "set pivot");
            Ok(Outcome::Applied(offset))
        })
    }
}

fn bounds_center(points: &[Point3]) -> Option<Point3> {
    let first = points.first()?;
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
    Some(nalgebra::center(&min, &max))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn pivot_moves_to_selection_center() {
        let mut cube = shapes::cube(1.0);
        let before = cube.world_positions();
        let offset = SetPivot::new(&[0, 1, 2, 3]).execute(&mut cube).unwrap().applied().unwrap();
        assert_relative_eq!(offset, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
        let corner = cube.vertices()[0].position;
        assert_relative_eq!(corner, Point3::new(-0.5, -0.5, 0.0), epsilon = 1e-12);
        for (a, b) in before.iter().zip(cube.world_positions()) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_selection_centers_whole_mesh() {
        let mut cube = shapes::cube(1.0);
        cube.transform = Matrix4::new_translation(&Vector3::new(3.0, 0.0, 0.0));
        let shifted: Vec<Point3> = cube.positions().iter().map(|p| p + Vector3::x()).collect();
        cube.set_positions(&shifted).unwrap();

        let offset = SetPivot::new(&[]).execute(&mut cube).unwrap().applied().unwrap();
        assert_relative_eq!(offset, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(
            cube.transform.transform_point(&Point3::origin()),
            Point3::new(4.0, 0.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn centered_pivot_declines() {
        let mut cube = shapes::cube(1.0);
        let outcome = SetPivot::new(&[]).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NothingToDo));
    }
}
