use super::{Point2, Point3, Vector3, TOLERANCE};

/// Computes the unit normal of a polygon using Newell's method.
///
/// Returns `None` for degenerate (zero-area) polygons.
#[must_use]
pub fn newell_normal(points: &[Point3]) -> Option<Vector3> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal.try_normalize(TOLERANCE)
}

/// Projects a 3D point onto the plane basis `(u_dir, v_dir)` anchored at
/// `origin`, returning 2D plane coordinates.
#[must_use]
pub fn project_to_plane(point: &Point3, origin: &Point3, u_dir: &Vector3, v_dir: &Vector3) -> Point2 {
    let diff = point - origin;
    Point2::new(diff.dot(u_dir), diff.dot(v_dir))
}

/// Area of a planar 3D polygon.
///
/// Uses the cross-product summation method, so the result is correct for
/// concave polygons as well.
#[must_use]
pub fn polygon_area(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let o = &points[0];
    let mut cross_sum = Vector3::zeros();
    for i in 1..points.len() - 1 {
        cross_sum += (points[i] - o).cross(&(points[i + 1] - o));
    }
    0.5 * cross_sum.norm()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_square() -> Vec<Point3> {
        vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)]
    }

    #[test]
    fn ccw_square_normal_points_up() {
        let n = newell_normal(&unit_square()).unwrap_or_else(Vector3::zeros);
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_have_no_normal() {
        assert!(newell_normal(&[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn unit_square_area() {
        assert_relative_eq!(polygon_area(&unit_square()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn triangle_area() {
        let tri = [p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(0.0, 3.0, 0.0)];
        assert_relative_eq!(polygon_area(&tri), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn projection_drops_normal_component() {
        let uv = project_to_plane(&p(2.0, 3.0, 9.0), &p(1.0, 1.0, 0.0), &Vector3::x(), &Vector3::y());
        assert_relative_eq!(uv, Point2::new(1.0, 2.0), epsilon = 1e-12);
    }
}
