use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::error::{Declined, Outcome, Result};
use crate::mesh::Mesh;
use crate::shared::SharedGroups;

use super::{distinct, transact};

/// Removes faces and every vertex left unreferenced.
#[derive(Debug, Clone)]
pub struct DeleteFaces {
    faces: Vec<usize>,
}

impl DeleteFaces {
    /// Creates a new `DeleteFaces` operation.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: distinct(faces),
        }
    }

    /// Executes the deletion and returns the vertex remap,
    /// `remap[old] = Some(new)` for surviving vertices.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<Option<usize>>>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            let remap = work.remove_faces(&self.faces);
            info!(faces = self.faces.len(), remaining = work.face_count(), "delete faces");
            Ok(Outcome::Applied(remap))
        })
    }
}

/// Where detached faces go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachTarget {
    /// Stay in the mesh with their own vertex records and groups.
    Submesh,
    /// Move into a new mesh.
    NewObject,
}

/// Result of a [`DetachFaces`].
#[derive(Debug, Clone, PartialEq)]
pub enum Detached {
    /// The detached faces, still in the source mesh.
    Submesh(Vec<usize>),
    /// A new mesh holding exactly the detached faces.
    NewObject(Box<Mesh>),
}

/// Separates faces from the rest of the mesh.
#[derive(Debug, Clone)]
pub struct DetachFaces {
    faces: Vec<usize>,
    target: DetachTarget,
}

impl DetachFaces {
    /// Creates a new `DetachFaces` operation.
    #[must_use]
    pub fn new(faces: &[usize], target: DetachTarget) -> Self {
        Self {
            faces: distinct(faces),
            target,
        }
    }

    /// Executes the detach.
    ///
    /// Declines with [`Declined::NothingToDetach`] when every face would be
    /// detached to a submesh.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Detached>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        match self.target {
            DetachTarget::Submesh if self.faces.len() == mesh.face_count() => {
                Ok(Declined::NothingToDetach.into())
            }
            DetachTarget::Submesh => transact(mesh, |work| {
                detach_in_place(work, &self.faces)?;
                info!(faces = self.faces.len(), "detach faces to submesh");
                Ok(Outcome::Applied(Detached::Submesh(self.faces.clone())))
            }),
            DetachTarget::NewObject => transact(mesh, |work| {
                let part = work.extract(&self.faces)?;
                work.remove_faces(&self.faces);
                info!(faces = part.face_count(), "detach faces to new object");
                Ok(Outcome::Applied(Detached::NewObject(Box::new(part))))
            }),
        }
    }
}

/// Gives `faces` records of their own and splits both partitions so the
/// detached records only share groups among themselves.
fn detach_in_place(work: &mut Mesh, faces: &[usize]) -> Result<()> {
    let selected: BTreeSet<usize> = faces.iter().copied().collect();
    let mut outside = vec![false; work.vertex_count()];
    for (f, face) in work.faces().iter().enumerate() {
        if !selected.contains(&f) {
            for &v in face.distinct_indices() {
                outside[v] = true;
            }
        }
    }

    let mut records = BTreeSet::new();
    for &f in faces {
        records.extend(work.face(f)?.distinct_indices().iter().copied());
    }
    // Records also used outside the selection are copied once.
    let mut copies = BTreeMap::new();
    let mut detached = BTreeSet::new();
    for v in records {
        if outside[v] {
            let vertex = *work.vertex(v)?;
            let copy = work.push_coincident(vertex, v);
            copies.insert(v, copy);
            detached.insert(copy);
        } else {
            detached.insert(v);
        }
    }
    for &f in faces {
        work.face_mut(f)?.remap(|i| copies.get(&i).copied().unwrap_or(i));
    }

    let relabel = |groups: &SharedGroups| {
        let base = groups.len();
        let mut labels = groups.lookup().to_vec();
        for &v in &detached {
            if let Some(label) = labels.get_mut(v) {
                *label += base;
            }
        }
        SharedGroups::from_labels(&labels)
    };
    let positions = relabel(work.shared_vertices());
    let textures = relabel(work.shared_textures());
    work.set_shared_vertices(positions)?;
    work.set_shared_textures(textures)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::mesh::{shapes, Face, Vertex};
    use crate::topology::NeighborFaces;

    fn triangle_pair() -> Mesh {
        let vertices = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, y)| Vertex::new(Point3::new(x, y, 0.0)))
            .collect();
        Mesh::new(vertices, vec![Face::triangle(0, 1, 2), Face::triangle(2, 1, 3)])
    }

    // ── delete ──

    #[test]
    fn delete_drops_orphaned_vertices() {
        let mut cube = shapes::cube(1.0);
        let remap = DeleteFaces::new(&[0]).execute(&mut cube).unwrap().applied().unwrap();
        assert_eq!(cube.face_count(), 5);
        assert_eq!(cube.vertex_count(), 20);
        assert_eq!(remap[4], Some(0));
        cube.validate().unwrap();
    }

    #[test]
    fn delete_nothing_declines() {
        let mut cube = shapes::cube(1.0);
        let outcome = DeleteFaces::new(&[]).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::EmptySelection));
    }

    // ── detach ──

    #[test]
    fn submesh_detach_disconnects_face() {
        let mut cube = shapes::cube(1.0);
        let _ = DetachFaces::new(&[0], DetachTarget::Submesh).execute(&mut cube).unwrap();
        assert_eq!(cube.shared_vertices().len(), 12);
        assert_eq!(NeighborFaces::of_face(0).execute(&cube).unwrap(), vec![0]);
        cube.validate().unwrap();
    }

    #[test]
    fn submesh_detach_copies_shared_records() {
        let mut mesh = triangle_pair();
        let _ = DetachFaces::new(&[1], DetachTarget::Submesh).execute(&mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert!(!mesh.faces()[1].contains(1));
        assert!(!mesh.faces()[1].contains(2));
        assert_eq!(NeighborFaces::of_face(1).execute(&mesh).unwrap(), vec![1]);
    }

    #[test]
    fn detaching_everything_to_submesh_declines() {
        let mut cube = shapes::cube(1.0);
        let all: Vec<usize> = (0..6).collect();
        let outcome = DetachFaces::new(&all, DetachTarget::Submesh).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NothingToDetach));
    }

    #[test]
    fn new_object_takes_faces_away() {
        let mut cube = shapes::cube(1.0);
        let Detached::NewObject(part) = DetachFaces::new(&[0], DetachTarget::NewObject)
            .execute(&mut cube)
            .unwrap()
            .applied()
            .unwrap()
        else {
            panic!("expected a new object");
        };
        assert_eq!(part.face_count(), 1);
        assert_eq!(part.vertex_count(), 4);
        assert_eq!(cube.face_count(), 5);
        part.validate().unwrap();
    }
}
