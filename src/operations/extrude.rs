use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Declined, OperationError, Outcome, Result};
use crate::math::{try_normalize, Vector3};
use crate::mesh::{Edge, Face, Mesh};
use crate::topology::Adjacency;
use crate::uv::projection::face_vertices;

use super::{distinct, finish, transact};

/// Extrudes faces along their normals.
///
/// The selected faces get new vertex records, detaching them from
/// unselected neighbors, and move along the averaged normal of each
/// position group. A side quad is built on every edge of the selection's
/// perimeter.
#[derive(Debug, Clone)]
pub struct ExtrudeFaces {
    faces: Vec<usize>,
    distance: f64,
}

impl ExtrudeFaces {
    /// Creates a new `ExtrudeFaces` operation.
    #[must_use]
    pub fn new(faces: &[usize], distance: f64) -> Self {
        Self {
            faces: distinct(faces),
            distance,
        }
    }

    /// Executes the extrusion and returns the extruded faces' new indices.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face
    /// or vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<usize>>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            let adjacency = Adjacency::new(work);
            // Perimeter: local edges appearing in exactly one selected face.
            let mut uses: BTreeMap<Edge, usize> = BTreeMap::new();
            for &f in &self.faces {
                for (_, common) in adjacency.face_edges(f) {
                    *uses.entry(*common).or_insert(0) += 1;
                }
            }
            let perimeter: Vec<(usize, Edge)> = self
                .faces
                .iter()
                .flat_map(|&f| {
                    adjacency
                        .face_edges(f)
                        .iter()
                        .filter(|(_, common)| uses.get(common) == Some(&1))
                        .map(move |(local, _)| (f, *local))
                })
                .collect();

            let mut normals: BTreeMap<usize, Vector3> = BTreeMap::new();
            for &f in &self.faces {
                let n = work.face_normal(f)?;
                for &v in work.faces()[f].distinct_indices() {
                    let g = adjacency.group_of(v).unwrap_or(usize::MAX);
                    *normals.entry(g).or_insert_with(Vector3::zeros) += n;
                }
            }

            // New top records, welded per original position group and per
            // original UV group.
            let records = face_vertices(work, &self.faces);
            let mut top: BTreeMap<usize, usize> = BTreeMap::new();
            let mut top_of_group: BTreeMap<usize, usize> = BTreeMap::new();
            let mut uv_sets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for &v in &records {
                let g = adjacency.group_of(v).unwrap_or(usize::MAX);
                let offset = normals
                    .get(&g)
                    .and_then(try_normalize)
                    .map_or_else(Vector3::zeros, |n| n * self.distance);
                let mut vertex = *work.vertex(v)?;
                vertex.position += offset;
                let new = match top_of_group.get(&g) {
                    Some(&mate) => work.push_coincident(vertex, mate),
                    None => {
                        let new = work.push_vertex(vertex);
                        top_of_group.insert(g, new);
                        new
                    }
                };
                top.insert(v, new);
                if let Some(uv) = work.shared_textures().group_of(v) {
                    uv_sets.entry(uv).or_default().push(new);
                }
            }
            for set in uv_sets.values().filter(|s| s.len() > 1) {
                work.shared_textures_mut().merge(set);
            }
            for &f in &self.faces {
                work.face_mut(f)?.remap(|i| top.get(&i).copied().unwrap_or(i));
            }

            for (f, edge) in &perimeter {
                let (Some(&ta), Some(&tb)) = (top.get(&edge.a), top.get(&edge.b)) else {
                    continue;
                };
                let corners = [edge.a, edge.b, tb, ta];
                let mut ring = [0; 4];
                for (slot, &v) in ring.iter_mut().zip(&corners) {
                    let vertex = *work.vertex(v)?;
                    *slot = work.push_coincident(vertex, v);
                }
                let mut side = Face::quad(ring[0], ring[1], ring[2], ring[3])
                    .with_metadata_of(&work.faces()[*f]);
                side.texture_group = -1;
                side.element_group = -1;
                work.faces_mut().push(side);
            }

            let compaction = finish(work)?;
            debug!(sides = perimeter.len(), distance = self.distance, "extruded faces");
            info!(faces = self.faces.len(), "extrude faces");
            Ok(Outcome::Applied(compaction.faces_of(&self.faces)))
        })
    }
}

/// Extrudes edges into new quads.
///
/// Every distinct endpoint group gets one new vertex, offset along the
/// averaged normal of the faces around the selected edges there. Each edge
/// spawns one quad wound to continue the surface of its face.
#[derive(Debug, Clone)]
pub struct ExtrudeEdges {
    edges: Vec<Edge>,
    distance: f64,
    manifold_only: bool,
}

impl ExtrudeEdges {
    /// Creates a new `ExtrudeEdges` operation.
    #[must_use]
    pub fn new(edges: &[Edge], distance: f64, manifold_only: bool) -> Self {
        let mut edges = edges.to_vec();
        edges.sort_unstable();
        edges.dedup();
        Self {
            edges,
            distance,
            manifold_only,
        }
    }

    /// Executes the extrusion and returns the new outer edges.
    ///
    /// Declines with [`Declined::EdgeNotFree`] when `manifold_only` is set and
    /// an edge already borders two faces.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] for an edge that borders no
    /// face, and [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<Edge>>> {
        if self.edges.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        for e in &self.edges {
            mesh.check_vertices(&[e.a, e.b])?;
        }
        transact(mesh, |work| {
            let adjacency = Adjacency::new(work);
            let mut oriented = Vec::with_capacity(self.edges.len());
            for edge in &self.edges {
                let Some(common) = adjacency.common(edge) else {
                    continue;
                };
                let faces = adjacency.faces_of_edge(&common);
                let Some(&f) = faces.first() else {
                    return Err(OperationError::InvalidInput(format!(
                        "edge ({}, {}) borders no face",
                        edge.a, edge.b
                    ))
                    .into());
                };
                if self.manifold_only && faces.len() > 1 {
                    return Ok(Declined::EdgeNotFree.into());
                }
                let local = adjacency.local_edge(f, &common).unwrap_or(*edge);
                oriented.push((f, local));
            }

            let mut normals: BTreeMap<usize, Vector3> = BTreeMap::new();
            for (_, local) in &oriented {
                let common = adjacency.common(local).unwrap_or(*local);
                for &face in adjacency.faces_of_edge(&common) {
                    let n = work.face_normal(face)?;
                    for g in [common.a, common.b] {
                        *normals.entry(g).or_insert_with(Vector3::zeros) += n;
                    }
                }
            }

            let mut extruded: BTreeMap<usize, usize> = BTreeMap::new();
            let mut out = Vec::with_capacity(oriented.len());
            for (f, local) in &oriented {
                let mut ends = [0; 2];
                for (slot, &v) in ends.iter_mut().zip(&[local.a, local.b]) {
                    let g = adjacency.group_of(v).unwrap_or(usize::MAX);
                    *slot = match extruded.get(&g) {
                        Some(&new) => new,
                        None => {
                            let offset = normals
                                .get(&g)
                                .and_then(try_normalize)
                                .map_or_else(Vector3::zeros, |n| n * self.distance);
                            let mut vertex = *work.vertex(v)?;
                            vertex.position += offset;
                            let new = work.push_vertex(vertex);
                            extruded.insert(g, new);
                            new
                        }
                    };
                }
                let [na, nb] = ends;
                let mut face = Face::quad(local.b, local.a, na, nb).with_metadata_of(&work.faces()[*f]);
                face.manual_uv = true;
                face.texture_group = -1;
                work.faces_mut().push(face);
                out.push(Edge::new(na, nb));
            }

            let compaction = finish(work)?;
            let edges = out
                .iter()
                .filter_map(|e| Some(Edge::new(compaction.vertex(e.a)?, compaction.vertex(e.b)?)))
                .collect();
            info!(edges = out.len(), distance = self.distance, "extrude edges");
            Ok(Outcome::Applied(edges))
        })
    }
}
