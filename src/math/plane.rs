use nalgebra::SymmetricEigen;

use super::{Matrix3, Point3, Vector3, TOLERANCE};

/// One of the six axis-aligned projection directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectionAxis {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl ProjectionAxis {
    /// Classifies a direction by its dominant component.
    ///
    /// Ties resolve in X, Y, Z order so classification is stable.
    #[must_use]
    pub fn from_direction(dir: &Vector3) -> Self {
        let (ax, ay, az) = (dir.x.abs(), dir.y.abs(), dir.z.abs());
        if ax >= ay && ax >= az {
            if dir.x >= 0.0 { Self::PosX } else { Self::NegX }
        } else if ay >= az {
            if dir.y >= 0.0 { Self::PosY } else { Self::NegY }
        } else if dir.z >= 0.0 {
            Self::PosZ
        } else {
            Self::NegZ
        }
    }

    /// Unit vector of this axis.
    #[must_use]
    pub fn vector(self) -> Vector3 {
        match self {
            Self::PosX => Vector3::x(),
            Self::NegX => -Vector3::x(),
            Self::PosY => Vector3::y(),
            Self::NegY => -Vector3::y(),
            Self::PosZ => Vector3::z(),
            Self::NegZ => -Vector3::z(),
        }
    }
}

/// Builds a right-handed orthonormal basis `(u, v)` on the plane with the
/// given unit normal, so that `u × v = normal`.
///
/// `v` points as close to world up as the plane allows; planes facing up or
/// down use world forward instead.
#[must_use]
pub fn plane_basis(normal: &Vector3) -> (Vector3, Vector3) {
    let up = match ProjectionAxis::from_direction(normal) {
        ProjectionAxis::PosY | ProjectionAxis::NegY => Vector3::z(),
        _ => Vector3::y(),
    };
    let u = up
        .cross(normal)
        .try_normalize(TOLERANCE)
        .unwrap_or_else(Vector3::x);
    let v = normal.cross(&u);
    (u, v)
}

/// Best-fit plane normal of a point cloud.
///
/// Uses the eigenvector of the smallest eigenvalue of the covariance matrix.
/// The sign is unspecified; callers orient it. Returns `None` for fewer than
/// three points.
#[must_use]
pub fn best_fit_normal(points: &[Point3]) -> Option<Vector3> {
    if points.len() < 3 {
        return None;
    }
    let center = super::centroid(points)?;

    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - center;
        cov += d * d.transpose();
    }

    let eigen = SymmetricEigen::new(cov);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let normal: Vector3 = eigen.eigenvectors.column(min_idx).into_owned();
    normal.try_normalize(TOLERANCE)
}
