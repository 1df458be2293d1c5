use std::collections::HashMap;

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2 as SpadePoint2, Triangulation};

use super::{newell_normal, plane_basis, project_to_plane, Point3};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Triangulates a simple polygon given as an ordered loop of points.
///
/// Returned triangles index into `points` and keep the winding of the input
/// loop. The loop is projected onto its Newell plane and triangulated with a
/// constrained Delaunay triangulation, so concave polygons are handled.
/// Degenerate or self-intersecting loops fall back to a fan.
#[must_use]
pub fn triangulate_polygon(points: &[Point3]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return vec![[0, 1, 2]];
    }

    let Some(normal) = newell_normal(points) else {
        return fan(n);
    };
    let (u_dir, v_dir) = plane_basis(&normal);
    let origin = points[0];
    let projected: Vec<SpadePoint2<f64>> = points
        .iter()
        .map(|p| {
            let uv = project_to_plane(p, &origin, &u_dir, &v_dir);
            SpadePoint2::new(uv.x, uv.y)
        })
        .collect();

    triangulate_projected(&projected).unwrap_or_else(|| fan(n))
}

fn fan(n: usize) -> Vec<[usize; 3]> {
    (1..n - 1).map(|i| [0, i, i + 1]).collect()
}

fn triangulate_projected(points: &[SpadePoint2<f64>]) -> Option<Vec<[usize; 3]>> {
    let mut cdt = Cdt::new();
    let mut lookup: HashMap<FixedVertexHandle, usize> = HashMap::with_capacity(points.len());
    let mut handles = Vec::with_capacity(points.len());

    for (i, &pt) in points.iter().enumerate() {
        let h = cdt.insert(pt).ok()?;
        // Two loop points collapsed onto one CDT vertex.
        if lookup.insert(h, i).is_some() {
            return None;
        }
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if !cdt.can_add_constraint(from, to) {
            return None;
        }
        cdt.add_constraint(from, to);
    }

    let exterior = exterior_faces(&cdt);
    let mut triangles = Vec::with_capacity(points.len() - 2);
    for face in cdt.inner_faces() {
        if exterior.get(face.fix().index()).copied().unwrap_or(true) {
            continue;
        }
        let [a, b, c] = face.vertices();
        triangles.push([
            *lookup.get(&a.fix())?,
            *lookup.get(&b.fix())?,
            *lookup.get(&c.fix())?,
        ]);
    }

    (triangles.len() == points.len() - 2).then_some(triangles)
}

/// Flags, by face index, the faces outside the constraint loop: every face
/// reachable from the convex hull without crossing a constraint edge.
fn exterior_faces(cdt: &Cdt) -> Vec<bool> {
    let mut exterior = vec![false; cdt.num_all_faces()];
    let mut pending: Vec<FixedFaceHandle<InnerTag>> = cdt
        .convex_hull()
        .filter(|edge| !edge.is_constraint_edge())
        .flat_map(|edge| [edge.face(), edge.rev().face()])
        .filter_map(|face| face.as_inner().map(|inner| inner.fix()))
        .collect();
    while let Some(fix) = pending.pop() {
        match exterior.get_mut(fix.index()) {
            Some(seen) if !*seen => *seen = true,
            _ => continue,
        }
        pending.extend(
            cdt.face(fix)
                .adjacent_edges()
                .into_iter()
                .filter(|edge| !edge.is_constraint_edge())
                .filter_map(|edge| edge.rev().face().as_inner().map(|face| face.fix())),
        );
    }
    exterior
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{polygon_area, triangle_normal, Vector3};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn total_area(points: &[Point3], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| 0.5 * triangle_normal(&points[t[0]], &points[t[1]], &points[t[2]]).norm())
            .sum()
    }

    #[test]
    fn triangle_is_returned_verbatim() {
        let pts = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        assert_eq!(triangulate_polygon(&pts), vec![[0, 1, 2]]);
    }

    #[test]
    fn quad_gives_two_triangles_with_same_winding() {
        let pts = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)];
        let tris = triangulate_polygon(&pts);
        assert_eq!(tris.len(), 2);
        for t in &tris {
            let n = triangle_normal(&pts[t[0]], &pts[t[1]], &pts[t[2]]);
            assert!(n.dot(&Vector3::z()) > 0.0);
        }
    }

    #[test]
    fn concave_l_shape_covers_its_area() {
        let pts = [
            p(0.0, 0.0, 0.0),
            p(4.0, 0.0, 0.0),
            p(4.0, 2.0, 0.0),
            p(2.0, 2.0, 0.0),
            p(2.0, 4.0, 0.0),
            p(0.0, 4.0, 0.0),
        ];
        let tris = triangulate_polygon(&pts);
        assert_eq!(tris.len(), 4);
        assert!((total_area(&pts, &tris) - polygon_area(&pts)).abs() < 1e-9);
    }

    #[test]
    fn vertical_polygon_keeps_winding() {
        let pts = [
            p(0.0, 0.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(0.0, 1.0, 1.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.5, -0.5),
        ];
        let expected = newell_normal(&pts).unwrap_or_else(Vector3::zeros);
        let tris = triangulate_polygon(&pts);
        assert_eq!(tris.len(), 3);
        for t in &tris {
            let n = triangle_normal(&pts[t[0]], &pts[t[1]], &pts[t[2]]);
            assert!(n.dot(&expected) > 0.0);
        }
    }
}
