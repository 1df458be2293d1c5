use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Declined, Outcome, Result};
use crate::math::{centroid, Point3};
use crate::mesh::Mesh;
use crate::shared::cluster_points;

use super::{distinct, finish, transact, Compaction};

/// Result of a [`Weld`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welded {
    /// One surviving vertex per merged group, after compaction.
    pub representatives: Vec<usize>,
    /// `remap[old] = Some(new)` for every vertex that survived.
    pub remap: Vec<Option<usize>>,
    /// Vertex count after compaction.
    pub vertex_count: usize,
}

/// Welds the position groups touched by a vertex set whose representative
/// positions lie within a distance of each other.
///
/// The distance test is inclusive and transitive. Every member of a merged
/// cluster moves to the centroid of the cluster's group positions.
#[derive(Debug, Clone)]
pub struct Weld {
    indices: Vec<usize>,
    distance: f64,
}

impl Weld {
    /// Creates a new `Weld` operation.
    #[must_use]
    pub fn new(indices: &[usize], distance: f64) -> Self {
        Self {
            indices: distinct(indices),
            distance: distance.max(0.0),
        }
    }

    /// Executes the weld.
    ///
    /// Declines with [`Declined::NothingToDo`] when fewer than two groups are
    /// touched or no two of them are close enough, so welding twice is the
    /// same as welding once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Welded>> {
        mesh.check_vertices(&self.indices)?;
        transact(mesh, |work| {
            let groups = work.shared_vertices().groups_of(&self.indices);
            if groups.len() < 2 {
                return Ok(Declined::NothingToDo.into());
            }
            let members: Vec<Vec<usize>> = groups
                .iter()
                .map(|&g| work.shared_vertices().group(g).map(<[usize]>::to_vec).unwrap_or_default())
                .collect();
            let anchors: Vec<Point3> = members
                .iter()
                .map(|m| m.first().map_or(Point3::origin(), |&v| work.vertices()[v].position))
                .collect();

            let roots = cluster_points(&anchors, self.distance, true);
            let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (k, &root) in roots.iter().enumerate() {
                clusters.entry(root).or_default().push(k);
            }
            let merged: Vec<Vec<usize>> = clusters
                .into_values()
                .filter(|c| c.len() > 1)
                .map(|c| {
                    let target = centroid(c.iter().map(|&k| &anchors[k])).unwrap_or(anchors[c[0]]);
                    let vertices: Vec<usize> = c.iter().flat_map(|&k| members[k].iter().copied()).collect();
                    move_and_merge(work, &vertices, target);
                    vertices
                })
                .collect();
            if merged.is_empty() {
                return Ok(Declined::NothingToDo.into());
            }

            let compaction = finish(work)?;
            let representatives = merged
                .iter()
                .filter_map(|vertices| surviving(&compaction, vertices))
                .collect();
            debug!(clusters = merged.len(), distance = self.distance, "welded vertices");
            info!(vertices = work.vertex_count(), "weld");
            Ok(Outcome::Applied(Welded {
                representatives,
                remap: compaction.vertices,
                vertex_count: work.vertex_count(),
            }))
        })
    }
}

/// Merges every group touched by a vertex set into one, at the centroid of
/// the distinct group positions.
#[derive(Debug, Clone)]
pub struct Collapse {
    indices: Vec<usize>,
}

impl Collapse {
    /// Creates a new `Collapse` operation.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
        }
    }

    /// Executes the collapse and returns the surviving vertex index, or
    /// `None` when every face around it degenerated away.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Option<usize>>> {
        mesh.check_vertices(&self.indices)?;
        transact(mesh, |work| {
            let groups = work.shared_vertices().groups_of(&self.indices);
            if groups.len() < 2 {
                return Ok(Declined::NothingToDo.into());
            }
            let mut vertices = Vec::new();
            let mut anchors = Vec::with_capacity(groups.len());
            for &g in &groups {
                let group = work.shared_vertices().group(g).unwrap_or(&[]);
                if let Some(&first) = group.first() {
                    anchors.push(work.vertices()[first].position);
                }
                vertices.extend_from_slice(group);
            }
            let Some(target) = centroid(&anchors) else {
                return Ok(Declined::NothingToDo.into());
            };
            move_and_merge(work, &vertices, target);
            let compaction = finish(work)?;
            info!(groups = groups.len(), "collapse");
            Ok(Outcome::Applied(surviving(&compaction, &vertices)))
        })
    }
}

/// Breaks vertices out of their position groups.
///
/// A vertex used by several faces is duplicated so that each face ends up
/// with its own record; every record becomes its own position group.
#[derive(Debug, Clone)]
pub struct Split {
    indices: Vec<usize>,
}

impl Split {
    /// Creates a new `Split` operation.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
        }
    }

    /// Executes the split and returns every resulting record, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<usize>>> {
        if self.indices.is_empty() {
            return Ok(Declined::NothingToDo.into());
        }
        mesh.check_vertices(&self.indices)?;
        transact(mesh, |work| {
            let mut users: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (f, face) in work.faces().iter().enumerate() {
                for &v in face.distinct_indices() {
                    if self.indices.binary_search(&v).is_ok() {
                        users.entry(v).or_default().push(f);
                    }
                }
            }
            let changes = self.indices.iter().any(|&v| {
                work.shared_vertices().coincident(v).len() > 1
                    || users.get(&v).is_some_and(|f| f.len() > 1)
            });
            if !changes {
                return Ok(Declined::NothingToDo.into());
            }

            let mut records = self.indices.clone();
            for &v in &self.indices {
                work.shared_vertices_mut().detach(v);
                let Some(faces) = users.get(&v) else {
                    continue;
                };
                for &f in faces.iter().skip(1) {
                    let vertex = work.vertices()[v];
                    let copy = work.push_vertex(vertex);
                    work.shared_textures_mut().merge(&[v, copy]);
                    work.face_mut(f)?.remap(|i| if i == v { copy } else { i });
                    records.push(copy);
                }
            }
            records.sort_unstable();
            debug!(records = records.len(), "split vertices");
            Ok(Outcome::Applied(records))
        })
    }
}

/// Moves `vertices` to `target`, welds them and joins the element groups of
/// the faces around them, keeping the lowest id.
fn move_and_merge(work: &mut Mesh, vertices: &[usize], target: Point3) {
    for &v in vertices {
        if let Some(vertex) = work.vertices_mut().get_mut(v) {
            vertex.position = target;
        }
    }
    work.shared_vertices_mut().merge(vertices);

    let ids: Vec<i32> = work
        .faces()
        .iter()
        .filter(|f| f.element_group >= 0 && vertices.iter().any(|&v| f.contains(v)))
        .map(|f| f.element_group)
        .collect();
    let Some(&lowest) = ids.iter().min() else {
        return;
    };
    for face in work.faces_mut() {
        if ids.contains(&face.element_group) {
            face.element_group = lowest;
        }
    }
}

/// First vertex of `vertices` that survived compaction, in its new index.
fn surviving(compaction: &Compaction, vertices: &[usize]) -> Option<usize> {
    let mut sorted = vertices.to_vec();
    sorted.sort_unstable();
    sorted.into_iter().find_map(|v| compaction.vertex(v))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::mesh::shapes;
    use crate::shared::SharedGroups;

    fn unwelded_cube() -> Mesh {
        let mut cube = shapes::cube(1.0);
        cube.set_shared_vertices(SharedGroups::singletons(24)).unwrap();
        cube
    }

    // ── weld ──

    #[test]
    fn weld_cube_corners_into_eight_groups() {
        let mut cube = unwelded_cube();
        let all: Vec<usize> = (0..24).collect();
        let welded = Weld::new(&all, 0.01).execute(&mut cube).unwrap().applied().unwrap();
        assert_eq!(welded.representatives.len(), 8);
        assert_eq!(welded.vertex_count, 24);
        assert_eq!(cube.shared_vertices().len(), 8);
        assert!(cube.shared_vertices().iter().all(|g| g.len() == 3));
    }

    #[test]
    fn weld_is_idempotent() {
        let mut cube = unwelded_cube();
        let all: Vec<usize> = (0..24).collect();
        let _ = Weld::new(&all, 0.01).execute(&mut cube).unwrap();
        let once = cube.clone();
        let again = Weld::new(&all, 0.01).execute(&mut cube).unwrap();
        assert_eq!(again.declined(), Some(&Declined::NothingToDo));
        assert_eq!(cube, once);
    }

    #[test]
    fn weld_moves_members_to_centroid() {
        let mut plane = shapes::plane(2.0, 1.0, 2, 1);
        plane.set_shared_vertices(SharedGroups::singletons(8)).unwrap();
        // Vertices 1 and 4 are the same grid point on either side of the seam.
        plane.vertices_mut()[4].position.y = 0.004;
        let _ = Weld::new(&[1, 4], 0.01).execute(&mut plane).unwrap();
        assert_relative_eq!(plane.vertices()[1].position.y, 0.002, epsilon = 1e-12);
        assert_eq!(plane.vertices()[1].position, plane.vertices()[4].position);
        let outcome = Weld::new(&[1, 4], 0.01).execute(&mut plane).unwrap();
        assert!(!outcome.is_applied());
    }

    #[test]
    fn weld_of_single_vertex_declines() {
        let mut cube = unwelded_cube();
        let outcome = Weld::new(&[5], 1.0).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NothingToDo));
    }

    #[test]
    fn weld_joins_element_groups() {
        let mut cube = unwelded_cube();
        cube.face_mut(0).unwrap().element_group = 5;
        cube.face_mut(3).unwrap().element_group = 2;
        // Vertex 0 (+Z side) and vertex 13 (-X side) share a corner.
        let _ = Weld::new(&[0, 13], 0.01).execute(&mut cube).unwrap();
        assert_eq!(cube.faces()[0].element_group, 2);
    }

    // ── collapse ──

    #[test]
    fn collapse_top_face_removes_it() {
        let mut cube = shapes::cube(2.0);
        let top = cube.face_perimeter(4).unwrap();
        let kept = Collapse::new(&top).execute(&mut cube).unwrap().applied().unwrap();
        assert!(kept.is_some());
        // The top face and every side triangle touching two top corners
        // degenerate; the cube becomes a pyramid.
        assert_eq!(cube.shared_vertices().len(), 5);
        let apex = cube.vertices()[kept.unwrap()].position;
        assert_relative_eq!(apex, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        cube.validate().unwrap();
    }

    #[test]
    fn collapse_within_one_group_declines() {
        let mut cube = shapes::cube(1.0);
        let outcome = Collapse::new(&[0, 13]).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NothingToDo));
    }

    // ── split ──

    #[test]
    fn split_then_weld_restores_groups() {
        let mut cube = shapes::cube(1.0);
        let original = cube.shared_vertices().clone();
        let corner = cube.shared_vertices().coincident(0).to_vec();
        assert_eq!(corner, vec![0, 13, 23]);
        let records = Split::new(&corner).execute(&mut cube).unwrap().applied().unwrap();
        assert_eq!(records, corner);
        assert_eq!(cube.shared_vertices().len(), 10);
        let _ = Weld::new(&records, 0.0).execute(&mut cube).unwrap();
        assert_eq!(cube.shared_vertices(), &original);
    }

    #[test]
    fn split_duplicates_shared_records() {
        let mut mesh = Mesh::new(
            vec![
                crate::mesh::Vertex::new(Point3::new(0.0, 0.0, 0.0)),
                crate::mesh::Vertex::new(Point3::new(1.0, 0.0, 0.0)),
                crate::mesh::Vertex::new(Point3::new(0.0, 1.0, 0.0)),
                crate::mesh::Vertex::new(Point3::new(-1.0, 0.0, 0.0)),
            ],
            vec![
                crate::mesh::Face::triangle(0, 1, 2),
                crate::mesh::Face::triangle(0, 2, 3),
            ],
        );
        let records = Split::new(&[0]).execute(&mut mesh).unwrap().applied().unwrap();
        assert_eq!(records, vec![0, 4]);
        assert!(mesh.faces()[1].contains(4));
        assert!(!mesh.faces()[1].contains(0));
        assert_eq!(Split::new(&[0]).execute(&mut mesh).unwrap().declined(), Some(&Declined::NothingToDo));
    }
}
