use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::error::{Declined, Outcome, Result};
use crate::mesh::{Edge, Face, Mesh, Vertex};
use crate::topology::Adjacency;

use super::{distinct, finish, split_template, transact};

/// Midpoint records keyed by common edge; the first record of an edge is the
/// position anchor the others weld to.
#[derive(Debug, Default)]
pub(super) struct Midpoints {
    anchors: BTreeMap<Edge, usize>,
}

impl Midpoints {
    /// A new midpoint record of the local edge `(a, b)`, welded to any
    /// earlier midpoint of the same common edge.
    pub(super) fn insert(
        &mut self,
        mesh: &mut Mesh,
        common: Edge,
        a: usize,
        b: usize,
    ) -> Result<usize> {
        let vertex = mesh.vertex(a)?.lerp(mesh.vertex(b)?, 0.5);
        Ok(match self.anchors.get(&common) {
            Some(&mate) => mesh.push_coincident(vertex, mate),
            None => {
                let record = mesh.push_vertex(vertex);
                self.anchors.insert(common, record);
                record
            }
        })
    }

    pub(super) fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Inserts the midpoints into the perimeter of every face outside
    /// `skip` that borders a split edge, re-triangulating it in place.
    /// Returns the number of faces touched.
    pub(super) fn spread(
        &mut self,
        mesh: &mut Mesh,
        adjacency: &Adjacency,
        skip: &BTreeSet<usize>,
    ) -> Result<usize> {
        let neighbors: BTreeSet<usize> = self
            .anchors
            .keys()
            .flat_map(|common| adjacency.faces_of_edge(common).iter().copied())
            .filter(|g| !skip.contains(g))
            .collect();
        for &g in &neighbors {
            let Some(ring) = mesh.face(g)?.perimeter() else {
                continue;
            };
            let n = ring.len();
            let mut widened = Vec::with_capacity(n * 2);
            for i in 0..n {
                let (a, b) = (ring[i], ring[(i + 1) % n]);
                widened.push(a);
                let Some(common) = adjacency.common(&Edge::new(a, b)) else {
                    continue;
                };
                if self.anchors.contains_key(&common) {
                    widened.push(self.insert(mesh, common, a, b)?);
                }
            }
            let template = mesh.face(g)?.clone();
            let face = mesh.polygon_face(&widened, &template)?;
            *mesh.face_mut(g)? = face;
        }
        Ok(neighbors.len())
    }
}

/// Subdivides faces.
///
/// Triangles split into four at their edge midpoints; polygons with four or
/// more corners split into one quad per corner around their centroid.
/// Unselected neighbors receive the new midpoints on their perimeter so the
/// surface stays connected. Children inherit every metadata field; children
/// of an ungrouped auto-UV face share a fresh texture group.
#[derive(Debug, Clone)]
pub struct SubdivideFaces {
    faces: Vec<usize>,
}

impl SubdivideFaces {
    /// Creates a new `SubdivideFaces` operation.
    #[must_use]
    pub fn new(faces: &[usize]) -> Self {
        Self {
            faces: distinct(faces),
        }
    }

    /// Executes the subdivision and returns every child face.
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
            let selected: BTreeSet<usize> = self.faces.iter().copied().collect();
            let mut midpoints = Midpoints::default();
            let mut children = Vec::new();
            let mut appended = Vec::new();

            for &f in &self.faces {
                let Some(ring) = work.faces()[f].perimeter() else {
                    warn!(face = f, "skipping subdivision of a face without a simple perimeter");
                    continue;
                };
                let n = ring.len();
                let mut mids = Vec::with_capacity(n);
                for i in 0..n {
                    let (a, b) = (ring[i], ring[(i + 1) % n]);
                    let common = adjacency.common(&Edge::new(a, b)).unwrap_or(Edge::new(a, b));
                    mids.push(midpoints.insert(work, common, a, b)?);
                }

                let parent = split_template(work, f)?;
                let pieces: Vec<Vec<usize>> = if n == 3 {
                    vec![
                        vec![ring[0], mids[0], mids[2]],
                        vec![mids[0], ring[1], mids[1]],
                        vec![mids[2], mids[1], ring[2]],
                        vec![mids[0], mids[1], mids[2]],
                    ]
                } else {
                    let corners = ring.iter().map(|&v| work.vertex(v)).collect::<Result<Vec<_>>>()?;
                    let Some(center) = Vertex::average(corners) else {
                        continue;
                    };
                    let c = work.push_vertex(center);
                    (0..n)
                        .map(|i| vec![ring[i], mids[i], c, mids[(i + n - 1) % n]])
                        .collect()
                };

                for (k, piece) in pieces.into_iter().enumerate() {
                    let indices = if piece.len() == 4 {
                        vec![piece[0], piece[1], piece[2], piece[0], piece[2], piece[3]]
                    } else {
                        piece
                    };
                    let child = Face::new(indices).with_metadata_of(&parent);
                    if k == 0 {
                        *work.face_mut(f)? = child;
                        children.push(f);
                    } else {
                        appended.push(work.face_count());
                        work.faces_mut().push(child);
                    }
                }
            }
            if children.is_empty() {
                return Ok(Declined::NothingToDo.into());
            }

            // Neighbors pick up the midpoints of subdivided edges they share.
            let neighbors = midpoints.spread(work, &adjacency, &selected)?;

            children.extend(appended);
            let compaction = finish(work)?;
            debug!(neighbors, midpoints = midpoints.len(), "subdivided");
            info!(faces = self.faces.len(), children = children.len(), "subdivide faces");
            Ok(Outcome::Applied(compaction.faces_of(&children)))
        })
    }
}
