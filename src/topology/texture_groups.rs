use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::mesh::Mesh;

/// Auto-UV faces of every positive texture group, keyed by group.
pub(crate) fn auto_texture_groups(mesh: &Mesh) -> BTreeMap<i32, Vec<usize>> {
    let mut groups: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (f, face) in mesh.faces().iter().enumerate() {
        if face.texture_group > 0 && !face.manual_uv {
            groups.entry(face.texture_group).or_default().push(f);
        }
    }
    groups
}

/// For each positive texture group the selection touches but does not fully
/// contain, the full list of that group's auto-UV faces.
#[derive(Debug, Clone)]
pub struct IncompleteTextureGroups {
    faces: Vec<usize>,
}

impl IncompleteTextureGroups {
    /// Creates a new `IncompleteTextureGroups` query.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
        }
    }

    /// Executes the query; groups are returned in ascending group id order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<Vec<usize>>> {
        mesh.check_faces(&self.faces)?;
        let selected: BTreeSet<usize> = self.faces.iter().copied().collect();
        let touched: BTreeSet<i32> = selected
            .iter()
            .map(|&f| &mesh.faces()[f])
            .filter(|face| face.texture_group > 0 && !face.manual_uv)
            .map(|face| face.texture_group)
            .collect();
        Ok(auto_texture_groups(mesh)
            .into_iter()
            .filter(|(g, members)| {
                touched.contains(g) && members.iter().any(|f| !selected.contains(f))
            })
            .map(|(_, members)| members)
            .collect())
    }
}

/// Grows a face selection to include every auto-UV mate of the texture
/// groups it touches.
#[derive(Debug, Clone)]
pub struct SelectTextureGroups {
    faces: Vec<usize>,
}

impl SelectTextureGroups {
    /// Creates a new `SelectTextureGroups` query.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
        }
    }

    /// Executes the query; the result is ascending.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<usize>> {
        let mut out: BTreeSet<usize> = self.faces.iter().copied().collect();
        for group in IncompleteTextureGroups::new(&self.faces).execute(mesh)? {
            out.extend(group);
        }
        Ok(out.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    fn grouped_cube() -> Mesh {
        let mut cube = shapes::cube(1.0);
        for f in [0, 2, 4] {
            cube.face_mut(f).unwrap().texture_group = 3;
        }
        cube.face_mut(1).unwrap().texture_group = 5;
        cube
    }

    #[test]
    fn partial_group_is_reported_whole() {
        let cube = grouped_cube();
        let groups = IncompleteTextureGroups::new(&[0, 1]).execute(&cube).unwrap();
        assert_eq!(groups, vec![vec![0, 2, 4]]);
    }

    #[test]
    fn manual_faces_are_not_group_members() {
        let mut cube = grouped_cube();
        cube.face_mut(4).unwrap().manual_uv = true;
        let groups = IncompleteTextureGroups::new(&[0, 2]).execute(&cube).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn select_texture_groups_adds_mates() {
        let cube = grouped_cube();
        let faces = SelectTextureGroups::new(&[2, 5]).execute(&cube).unwrap();
        assert_eq!(faces, vec![0, 2, 4, 5]);
    }
}
