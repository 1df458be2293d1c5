use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::mesh::Mesh;
use crate::shared::UnionFind;

/// Recomputes element groups (UV shells).
///
/// Faces joined through a vertex record, a UV weld or a positive texture
/// group end up in one shell. Each shell keeps the lowest id any of its faces
/// already carried and no other shell claimed; shells without one get a fresh
/// id. Returns the number of shells.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshElementGroups;

impl RefreshElementGroups {
    /// Creates a new `RefreshElementGroups` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the refresh.
    pub fn execute(&self, mesh: &mut Mesh) -> usize {
        let faces = mesh.faces();
        let mut uf = UnionFind::new(faces.len());
        let mut by_uv: BTreeMap<usize, usize> = BTreeMap::new();
        let mut by_texture: BTreeMap<i32, usize> = BTreeMap::new();
        for (f, face) in faces.iter().enumerate() {
            for &i in face.distinct_indices() {
                let key = mesh.shared_textures().group_of(i).unwrap_or(usize::MAX);
                match by_uv.get(&key) {
                    Some(&other) => uf.union(other, f),
                    None => {
                        by_uv.insert(key, f);
                    }
                }
            }
            if face.texture_group > 0 {
                match by_texture.get(&face.texture_group) {
                    Some(&other) => uf.union(other, f),
                    None => {
                        by_texture.insert(face.texture_group, f);
                    }
                }
            }
        }

        let mut shells: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for f in 0..faces.len() {
            shells.entry(uf.find(f)).or_default().push(f);
        }

        let mut claimed = BTreeSet::new();
        let mut next = mesh.unused_element_group();
        let mut assignment = Vec::with_capacity(shells.len());
        for members in shells.values() {
            let existing: BTreeSet<i32> = members
                .iter()
                .map(|&f| faces[f].element_group)
                .filter(|&g| g >= 0)
                .collect();
            let id = match existing.into_iter().find(|g| !claimed.contains(g)) {
                Some(id) => id,
                None => {
                    next += 1;
                    next - 1
                }
            };
            claimed.insert(id);
            assignment.push((members.clone(), id));
        }

        let count = assignment.len();
        for (members, id) in assignment {
            for f in members {
                mesh.faces_mut()[f].element_group = id;
            }
        }
        debug!(shells = count, "refreshed element groups");
        count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    #[test]
    fn unwelded_cube_sides_are_separate_shells() {
        let mut cube = shapes::cube(1.0);
        assert_eq!(RefreshElementGroups::new().execute(&mut cube), 6);
        let ids: BTreeSet<i32> = cube.faces().iter().map(|f| f.element_group).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn texture_group_joins_shells() {
        let mut cube = shapes::cube(1.0);
        cube.face_mut(0).unwrap().texture_group = 3;
        cube.face_mut(2).unwrap().texture_group = 3;
        assert_eq!(RefreshElementGroups::new().execute(&mut cube), 5);
        assert_eq!(cube.faces()[0].element_group, cube.faces()[2].element_group);
    }

    #[test]
    fn lowest_existing_id_survives() {
        let mut plane = shapes::plane(2.0, 1.0, 2, 1);
        plane.face_mut(0).unwrap().element_group = 7;
        plane.face_mut(1).unwrap().element_group = 4;
        // Weld the seam UVs so both quads form one shell.
        plane.shared_textures_mut().merge(&[1, 4]);
        assert_eq!(RefreshElementGroups::new().execute(&mut plane), 1);
        assert!(plane.faces().iter().all(|f| f.element_group == 4));
    }
}
