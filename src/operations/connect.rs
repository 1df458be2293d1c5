use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{Declined, Outcome, Result};
use crate::mesh::{Edge, Mesh, Vertex};
use crate::topology::{Adjacency, EdgeRing};

use super::subdivide::Midpoints;
use super::{finish, split_template, transact, Compaction};

/// Splits faces through the midpoints of selected edges.
///
/// A face holding two selected edges is cut once between their midpoints;
/// a face holding more is cut into one piece per edge around its centroid.
/// Faces holding a single selected edge only receive its midpoint.
#[derive(Debug, Clone)]
pub struct ConnectEdges {
    edges: Vec<Edge>,
}

impl ConnectEdges {
    /// Creates a new `ConnectEdges` operation.
    #[must_use]
    pub fn new(edges: &[Edge]) -> Self {
        Self {
            edges: edges.to_vec(),
        }
    }

    /// Executes the connection and returns the new edges.
    ///
    /// Declines with [`Declined::NoSplitPath`] when no face holds two
    /// selected edges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<Edge>>> {
        if self.edges.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        for e in &self.edges {
            mesh.check_vertices(&[e.a, e.b])?;
        }
        transact(mesh, |work| {
            let adjacency = Adjacency::new(work);
            let selected: BTreeSet<Edge> =
                self.edges.iter().filter_map(|e| adjacency.common(e)).collect();
            let common_of = |a: usize, b: usize| adjacency.common(&Edge::new(a, b));

            let mut plan = Vec::new();
            for (f, face) in work.faces().iter().enumerate() {
                let Some(ring) = face.perimeter() else {
                    continue;
                };
                let n = ring.len();
                let hits: Vec<usize> = (0..n)
                    .filter(|&i| {
                        common_of(ring[i], ring[(i + 1) % n]).is_some_and(|c| selected.contains(&c))
                    })
                    .collect();
                if hits.len() >= 2 {
                    plan.push((f, ring, hits));
                }
            }
            if plan.is_empty() {
                return Ok(Declined::NoSplitPath.into());
            }

            let mut midpoints = Midpoints::default();
            let mut split = BTreeSet::new();
            let mut edges = Vec::new();
            for (f, ring, hits) in plan {
                let n = ring.len();
                let mut widened = Vec::with_capacity(n + hits.len());
                let mut cuts = Vec::with_capacity(hits.len());
                for i in 0..n {
                    let (a, b) = (ring[i], ring[(i + 1) % n]);
                    widened.push(a);
                    if hits.contains(&i) {
                        let common = common_of(a, b).unwrap_or(Edge::new(a, b));
                        cuts.push(widened.len());
                        widened.push(midpoints.insert(work, common, a, b)?);
                    }
                }
                edges.extend(cut_face(work, f, &widened, &cuts)?);
                split.insert(f);
            }
            let widened = midpoints.spread(work, &adjacency, &split)?;

            let compaction = finish(work)?;
            debug!(split = split.len(), widened, "connected edges");
            info!(edges = edges.len(), "connect edges");
            Ok(Outcome::Applied(remap_edges(&compaction, &edges)))
        })
    }
}

/// Splits faces along new edges between selected vertices.
///
/// A face holding two selected, non-adjacent corners is cut once between
/// them; a face holding more is cut into pieces around its centroid.
#[derive(Debug, Clone)]
pub struct ConnectVertices {
    vertices: Vec<usize>,
}

impl ConnectVertices {
    /// Creates a new `ConnectVertices` operation.
    #[must_use]
    pub fn new(vertices: &[usize]) -> Self {
        Self {
            vertices: super::distinct(vertices),
        }
    }

    /// Executes the connection and returns the new edges.
    ///
    /// Declines with [`Declined::NoSplitPath`] when no face holds two
    /// selected corners that are not already joined by an edge.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<Edge>>> {
        if self.vertices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_vertices(&self.vertices)?;
        transact(mesh, |work| {
            let groups = work.shared_vertices().groups_of(&self.vertices);
            let lookup = work.common_lookup().to_vec();
            let mut plan = Vec::new();
            for (f, face) in work.faces().iter().enumerate() {
                let Some(ring) = face.perimeter() else {
                    continue;
                };
                let n = ring.len();
                let cuts: Vec<usize> = (0..n)
                    .filter(|&i| {
                        lookup.get(ring[i]).is_some_and(|g| groups.binary_search(g).is_ok())
                    })
                    .collect();
                let joined = |a: usize, b: usize| b - a == 1 || (a == 0 && b == n - 1);
                let skip = match cuts[..] {
                    [] | [_] => true,
                    [a, b] => joined(a, b),
                    _ => false,
                };
                if !skip {
                    plan.push((f, ring, cuts));
                }
            }
            if plan.is_empty() {
                return Ok(Declined::NoSplitPath.into());
            }

            let mut edges = Vec::new();
            for (f, ring, cuts) in &plan {
                edges.extend(cut_face(work, *f, ring, cuts)?);
            }
            let compaction = finish(work)?;
            info!(faces = plan.len(), edges = edges.len(), "connect vertices");
            Ok(Outcome::Applied(remap_edges(&compaction, &edges)))
        })
    }
}

/// Extends the selected edges into an edge ring and connects it, inserting
/// a loop of new edges across every quad the ring crosses.
#[derive(Debug, Clone)]
pub struct InsertEdgeLoop {
    edges: Vec<Edge>,
}

impl InsertEdgeLoop {
    /// Creates a new `InsertEdgeLoop` operation.
    #[must_use]
    pub fn new(edges: &[Edge]) -> Self {
        Self {
            edges: edges.to_vec(),
        }
    }

    /// Executes the insertion and returns the new edges.
    ///
    /// # Errors
    ///
    /// As [`ConnectEdges::execute`].
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<Vec<Edge>>> {
        if self.edges.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        let ring = EdgeRing::new(&self.edges).execute(mesh)?;
        ConnectEdges::new(&ring).execute(mesh)
    }
}

/// Replaces face `f` by the pieces of the loop `ring` cut at the positions
/// `cuts`: two cuts make two pieces, more cuts make one piece per cut around
/// a new centroid vertex. The first piece takes the face's slot.
///
/// Returns the cutting edges.
fn cut_face(work: &mut Mesh, f: usize, ring: &[usize], cuts: &[usize]) -> Result<Vec<Edge>> {
    let parent = split_template(work, f)?;
    let n = ring.len();
    let arc = |from: usize, to: usize| {
        let mut out = Vec::new();
        let mut i = from;
        loop {
            out.push(ring[i]);
            if i == to {
                break out;
            }
            i = (i + 1) % n;
        }
    };

    let (pieces, edges) = if let [a, b] = cuts[..] {
        (vec![arc(a, b), arc(b, a)], vec![Edge::new(ring[a], ring[b])])
    } else {
        let corners = ring.iter().map(|&v| work.vertex(v)).collect::<Result<Vec<_>>>()?;
        let Some(center) = Vertex::average(corners) else {
            return Ok(Vec::new());
        };
        let c = work.push_vertex(center);
        let k = cuts.len();
        let pieces = (0..k)
            .map(|j| {
                let mut piece = arc(cuts[j], cuts[(j + 1) % k]);
                piece.push(c);
                piece
            })
            .collect::<Vec<_>>();
        (pieces, cuts.iter().map(|&p| Edge::new(ring[p], c)).collect())
    };

    for (k, piece) in pieces.iter().enumerate() {
        let face = work.polygon_face(piece, &parent)?;
        if k == 0 {
            *work.face_mut(f)? = face;
        } else {
            work.faces_mut().push(face);
        }
    }
    Ok(edges)
}

fn remap_edges(compaction: &Compaction, edges: &[Edge]) -> Vec<Edge> {
    edges
        .iter()
        .filter_map(|e| Some(Edge::new(compaction.vertex(e.a)?, compaction.vertex(e.b)?)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Vector2;
    use crate::mesh::{shapes, AutoUnwrapSettings};

    // ── edges ──

    #[test]
    fn two_edges_cut_a_quad_once() {
        let mut cube = shapes::cube(1.0);
        let edges = ConnectEdges::new(&[Edge::new(0, 1), Edge::new(2, 3)])
            .execute(&mut cube)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(cube.face_count(), 7);
        assert_eq!(cube.shared_vertices().len(), 10);
        // The -Y and +Y sides picked up one midpoint each.
        assert_eq!(cube.faces()[4].perimeter().map(|r| r.len()), Some(5));
        assert_eq!(cube.faces()[5].perimeter().map(|r| r.len()), Some(5));
        cube.validate().unwrap();
    }

    #[test]
    fn fitted_halves_keep_their_uv_area() {
        let mut plane = shapes::plane(2.0, 2.0, 1, 1);
        plane.face_mut(0).unwrap().uv = AutoUnwrapSettings::fit();
        let _ = ConnectEdges::new(&[Edge::new(0, 1), Edge::new(2, 3)])
            .execute(&mut plane)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(plane.face_count(), 2);
        assert_eq!(plane.faces()[0].texture_group, plane.faces()[1].texture_group);
        for face in plane.faces() {
            let uvs: Vec<Vector2> = face
                .distinct_indices()
                .iter()
                .map(|&v| plane.vertices()[v].uv0)
                .collect();
            let min = uvs.iter().fold(uvs[0], |m, uv| m.inf(uv));
            let max = uvs.iter().fold(uvs[0], |m, uv| m.sup(uv));
            let extent = max - min;
            assert_relative_eq!(extent.x * extent.y, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn single_edges_have_no_split_path() {
        let mut cube = shapes::cube(1.0);
        let outcome = ConnectEdges::new(&[Edge::new(0, 1)]).execute(&mut cube).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NoSplitPath));
    }

    #[test]
    fn three_edges_cut_around_centroid() {
        let mut plane = shapes::plane(1.0, 1.0, 1, 1);
        let edges = ConnectEdges::new(&[Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 3)])
            .execute(&mut plane)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(plane.face_count(), 3);
    }

    #[test]
    fn edge_loop_rings_the_cube() {
        let mut cube = shapes::cube(1.0);
        let edges = InsertEdgeLoop::new(&[Edge::new(0, 1)])
            .execute(&mut cube)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(edges.len(), 4);
        assert_eq!(cube.face_count(), 10);
        assert_eq!(cube.shared_vertices().len(), 12);
    }

    // ── vertices ──

    #[test]
    fn opposite_corners_split_a_quad() {
        let mut plane = shapes::plane(1.0, 1.0, 1, 1);
        let edges = ConnectVertices::new(&[0, 2]).execute(&mut plane).unwrap().applied().unwrap();
        assert_eq!(edges, vec![Edge::new(0, 2)]);
        assert_eq!(plane.face_count(), 2);
    }

    #[test]
    fn adjacent_corners_are_already_connected() {
        let mut plane = shapes::plane(1.0, 1.0, 1, 1);
        let outcome = ConnectVertices::new(&[0, 1]).execute(&mut plane).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NoSplitPath));
    }
}
