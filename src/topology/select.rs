use std::collections::BTreeSet;

use crate::error::Result;
use crate::mesh::Mesh;

use super::{Adjacency, NeighborFaces};

/// Grows a face selection by one step.
///
/// Without an angle limit every face sharing a position group with the
/// selection is added. With a limit only faces sharing an edge are added,
/// and only when the angle between their normal and the selected face's
/// normal is at most the limit.
#[derive(Debug, Clone)]
pub struct GrowSelection {
    faces: Vec<usize>,
    max_angle_degrees: Option<f64>,
}

impl GrowSelection {
    /// Creates a new `GrowSelection` query.
    #[must_use]
    pub fn new(faces: &[usize], max_angle_degrees: Option<f64>) -> Self {
        Self {
            faces: faces.to_vec(),
            max_angle_degrees,
        }
    }

    /// Executes the query; the result is ascending and contains the input.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<usize>> {
        let adjacency = Adjacency::new(mesh);
        let Some(limit) = self.max_angle_degrees else {
            return NeighborFaces::of_faces(&self.faces).execute_with(mesh, &adjacency);
        };
        mesh.check_faces(&self.faces)?;
        let cos_limit = limit.to_radians().cos();
        let mut out: BTreeSet<usize> = self.faces.iter().copied().collect();
        for &f in &self.faces {
            let normal = mesh.face_normal(f)?;
            for (_, common) in adjacency.face_edges(f) {
                for &n in adjacency.faces_of_edge(common) {
                    if out.contains(&n) {
                        continue;
                    }
                    if normal.dot(&mesh.face_normal(n)?) >= cos_limit - 1e-9 {
                        out.insert(n);
                    }
                }
            }
        }
        Ok(out.into_iter().collect())
    }
}

/// Selects every face sharing a non-zero smoothing group with the
/// selection.
#[derive(Debug, Clone)]
pub struct SelectSmoothingGroup {
    faces: Vec<usize>,
}

impl SelectSmoothingGroup {
    /// Creates a new `SelectSmoothingGroup` query.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
        }
    }

    /// Executes the query; the result is ascending and contains the input.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<usize>> {
        mesh.check_faces(&self.faces)?;
        let groups: BTreeSet<u32> = self
            .faces
            .iter()
            .map(|&f| mesh.faces()[f].smoothing_group)
            .filter(|&g| g > 0)
            .collect();
        let mut out: BTreeSet<usize> = self.faces.iter().copied().collect();
        out.extend(
            mesh.faces()
                .iter()
                .enumerate()
                .filter(|(_, face)| groups.contains(&face.smoothing_group))
                .map(|(f, _)| f),
        );
        Ok(out.into_iter().collect())
    }
}

/// Selects the UV shells of the selection: faces in the same element group,
/// plus auto-UV faces in the same texture group.
#[derive(Debug, Clone)]
pub struct SelectUvShell {
    faces: Vec<usize>,
}

impl SelectUvShell {
    /// Creates a new `SelectUvShell` query.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
        }
    }

    /// Executes the query; the result is ascending and contains the input.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<usize>> {
        mesh.check_faces(&self.faces)?;
        let selected = self.faces.iter().map(|&f| &mesh.faces()[f]);
        let elements: BTreeSet<i32> = selected
            .clone()
            .map(|face| face.element_group)
            .filter(|&g| g >= 0)
            .collect();
        let textures: BTreeSet<i32> = selected
            .filter(|face| !face.manual_uv)
            .map(|face| face.texture_group)
            .filter(|&g| g > 0)
            .collect();
        let mut out: BTreeSet<usize> = self.faces.iter().copied().collect();
        for (f, face) in mesh.faces().iter().enumerate() {
            if elements.contains(&face.element_group)
                || (!face.manual_uv && textures.contains(&face.texture_group))
            {
                out.insert(f);
            }
        }
        Ok(out.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn grow_without_limit_matches_neighbors() {
        let plane = shapes::plane(3.0, 3.0, 3, 3);
        let grown = GrowSelection::new(&[4], None).execute(&plane).unwrap();
        assert_eq!(grown, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn grow_with_limit_follows_edges_only() {
        let plane = shapes::plane(3.0, 3.0, 3, 3);
        let grown = GrowSelection::new(&[4], Some(10.0)).execute(&plane).unwrap();
        assert_eq!(grown, vec![1, 3, 4, 5, 7]);
    }

    #[test]
    fn grow_with_limit_stops_at_cube_corners() {
        let cube = shapes::cube(1.0);
        let grown = GrowSelection::new(&[0], Some(45.0)).execute(&cube).unwrap();
        assert_eq!(grown, vec![0]);
        let grown = GrowSelection::new(&[0], Some(90.0)).execute(&cube).unwrap();
        assert_eq!(grown, vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn smoothing_group_zero_is_not_a_group() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(0).unwrap().smoothing_group = 2;
        cube.face_mut(3).unwrap().smoothing_group = 2;
        assert_eq!(SelectSmoothingGroup::new(&[0]).execute(&cube).unwrap(), vec![0, 3]);
        assert_eq!(SelectSmoothingGroup::new(&[1]).execute(&cube).unwrap(), vec![1]);
    }

    #[test]
    fn uv_shell_uses_element_groups() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(1).unwrap().element_group = 0;
        cube.face_mut(5).unwrap().element_group = 0;
        assert_eq!(SelectUvShell::new(&[5]).execute(&cube).unwrap(), vec![1, 5]);
    }
}
