use tracing::info;

use crate::error::{Declined, Outcome, Result};
use crate::mesh::{Edge, Face, Mesh};
use crate::topology::{Adjacency, BoundaryLoops};

use super::{finish, transact};

/// Builds a face between two open edges.
///
/// The new face is a quad, or a triangle when the edges share a vertex. It
/// is wound against the face of edge `a`, so it continues that surface.
#[derive(Debug, Clone)]
pub struct Bridge {
    a: Edge,
    b: Edge,
    limit_to_perimeter: bool,
}

impl Bridge {
    /// Creates a new `Bridge` operation.
    #[must_use]
    pub fn new(a: Edge, b: Edge, limit_to_perimeter: bool) -> Self {
        Self {
            a,
            b,
            limit_to_perimeter,
        }
    }

    /// Executes the bridge and returns the new face index.
    ///
    /// Declines with [`Declined::SameEdge`] for one edge given twice,
    /// [`Declined::EdgeNotFree`] unless both edges border exactly one face,
    /// and [`Declined::NotOnPerimeter`] when limited to the outer perimeter
    /// and an edge lies elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<usize>> {
        mesh.check_vertices(&[self.a.a, self.a.b, self.b.a, self.b.b])?;
        transact(mesh, |work| {
            let adjacency = Adjacency::new(work);
            let (Some(ca), Some(cb)) = (adjacency.common(&self.a), adjacency.common(&self.b)) else {
                return Ok(Declined::EdgeNotFree.into());
            };
            if ca == cb {
                return Ok(Declined::SameEdge.into());
            }
            let (&[fa], &[fb]) = (adjacency.faces_of_edge(&ca), adjacency.faces_of_edge(&cb)) else {
                return Ok(Declined::EdgeNotFree.into());
            };
            if self.limit_to_perimeter {
                let loops = BoundaryLoops::new().execute_with(&adjacency);
                let outer: Vec<Edge> = loops
                    .first()
                    .map(|l| l.iter().filter_map(|e| adjacency.common(e)).collect())
                    .unwrap_or_default();
                if !outer.contains(&ca) || !outer.contains(&cb) {
                    return Ok(Declined::NotOnPerimeter.into());
                }
            }

            let la = adjacency.local_edge(fa, &ca).unwrap_or(self.a);
            let lb = adjacency.local_edge(fb, &cb).unwrap_or(self.b);
            let group = |v: usize| adjacency.group_of(v);
            let ring: Vec<usize> = if let Some(shared) =
                [lb.a, lb.b].into_iter().find(|&v| group(v) == group(la.a) || group(v) == group(la.b))
            {
                let far = if shared == lb.a { lb.b } else { lb.a };
                vec![la.b, la.a, far]
            } else {
                let pos = |v: usize| work.vertices()[v].position;
                let (near, far) = if (pos(lb.a) - pos(la.a)).norm() <= (pos(lb.b) - pos(la.a)).norm() {
                    (lb.a, lb.b)
                } else {
                    (lb.b, lb.a)
                };
                vec![la.b, la.a, near, far]
            };

            let mut corners = Vec::with_capacity(ring.len());
            for &v in &ring {
                let vertex = *work.vertex(v)?;
                corners.push(work.push_coincident(vertex, v));
            }
            let face = match corners[..] {
                [a, b, c, d] => Face::quad(a, b, c, d),
                _ => Face::new(corners.clone()),
            };
            let mut face = face.with_metadata_of(&work.faces()[fa]);
            face.texture_group = -1;
            face.element_group = -1;
            let index = work.face_count();
            work.faces_mut().push(face);

            let compaction = finish(work)?;
            let Some(new) = compaction.face(index) else {
                return Ok(Declined::NothingToDo.into());
            };
            info!(corners = ring.len(), "bridge");
            Ok(Outcome::Applied(new))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Vector3;
    use crate::mesh::shapes;

    /// A 3x3 grid with the center quad removed.
    fn holed_grid() -> Mesh {
        let mut grid = shapes::plane(3.0, 3.0, 3, 3);
        grid.remove_faces(&[4]);
        grid
    }

    #[test]
    fn bridge_fills_hole_with_consistent_winding() {
        let mut grid = holed_grid();
        // Face 1 borders the hole with 4-5, face 6 (was 7) with 26-27.
        let face = Bridge::new(Edge::new(4, 5), Edge::new(26, 27), false)
            .execute(&mut grid)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(grid.face_count(), 9);
        assert_relative_eq!(grid.face_normal(face).unwrap(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn hole_edges_are_not_outer_perimeter() {
        let mut grid = holed_grid();
        let outcome = Bridge::new(Edge::new(4, 5), Edge::new(26, 27), true).execute(&mut grid).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NotOnPerimeter));
    }

    #[test]
    fn interior_edge_is_not_free() {
        let mut grid = shapes::plane(2.0, 1.0, 2, 1);
        let outcome = Bridge::new(Edge::new(1, 2), Edge::new(5, 6), false).execute(&mut grid).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::EdgeNotFree));
    }

    #[test]
    fn same_edge_declines() {
        let mut grid = shapes::plane(2.0, 1.0, 2, 1);
        let outcome = Bridge::new(Edge::new(0, 1), Edge::new(1, 0), false).execute(&mut grid).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::SameEdge));
    }

    #[test]
    fn edges_sharing_a_vertex_make_a_triangle() {
        let mut grid = shapes::plane(1.0, 1.0, 1, 1);
        let face = Bridge::new(Edge::new(0, 1), Edge::new(1, 2), false)
            .execute(&mut grid)
            .unwrap()
            .applied()
            .unwrap();
        assert_eq!(grid.faces()[face].triangle_count(), 1);
    }
}
