pub mod plane;
pub mod polygon;
pub mod triangulate;

pub use plane::{best_fit_normal, plane_basis, ProjectionAxis};
pub use polygon::{newell_normal, polygon_area, project_to_plane};
pub use triangulate::triangulate_polygon;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 4D vector type (tangents, colors, wide UV channels).
pub type Vector4 = nalgebra::Vector4<f64>;

/// 3x3 matrix.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Unnormalized normal of the triangle `(a, b, c)`; its length is twice the
/// triangle area.
#[must_use]
pub fn triangle_normal(a: &Point3, b: &Point3, c: &Point3) -> Vector3 {
    (b - a).cross(&(c - a))
}

/// Arithmetic mean of a set of points, or `None` for an empty set.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Point3> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p.coords;
        count += 1;
    }
    (count > 0).then(|| Point3::from(sum / count as f64))
}

/// Normalizes `v`, returning `None` for (near) zero vectors.
#[must_use]
pub fn try_normalize(v: &Vector3) -> Option<Vector3> {
    v.try_normalize(TOLERANCE)
}
