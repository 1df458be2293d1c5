//! Projection math shared by the UV operations.

use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};
use crate::math::{plane_basis, Point2, Point3, Vector2, Vector3, TOLERANCE};
use crate::mesh::{Anchor, AutoUnwrapSettings, Fill, Vertex};

/// Projects points onto the plane with the given unit normal.
///
/// The plane passes through the origin, so neighboring faces projected on
/// the same plane tile seamlessly.
#[must_use]
pub fn planar(points: &[Point3], normal: &Vector3) -> Vec<Point2> {
    let (u, v) = plane_basis(normal);
    points
        .iter()
        .map(|p| Point2::new(p.coords.dot(&u), p.coords.dot(&v)))
        .collect()
}

/// Maps points to longitude/latitude around `center`, scaled into `[0, 1]`.
#[must_use]
pub fn spherical(points: &[Point3], center: &Point3) -> Vec<Point2> {
    points
        .iter()
        .map(|p| {
            let d = (p - center).try_normalize(TOLERANCE).unwrap_or_else(Vector3::y);
            Point2::new(
                0.5 + d.z.atan2(d.x) / (2.0 * PI),
                0.5 - d.y.clamp(-1.0, 1.0).asin() / PI,
            )
        })
        .collect()
}

/// Axis-aligned bounds of a UV set, or `None` if it is empty.
#[must_use]
pub fn bounds(uvs: &[Point2]) -> Option<(Point2, Point2)> {
    let first = uvs.first()?;
    let mut min = *first;
    let mut max = *first;
    for p in uvs {
        min = min.inf(p);
        max = max.sup(p);
    }
    Some((min, max))
}

/// Applies auto-unwrap settings to projected coordinates.
///
/// Steps run in a fixed order: fill, swap, rotation around the bounds
/// center, flips, scale, anchor, then the offset is subtracted.
pub fn apply_settings(uvs: &mut [Point2], settings: &AutoUnwrapSettings) {
    let Some((min, max)) = bounds(uvs) else {
        return;
    };
    let extent = max - min;
    match settings.fill {
        Fill::Tile => {}
        Fill::Fit => {
            let scale = extent.x.max(extent.y);
            if scale > TOLERANCE {
                for p in uvs.iter_mut() {
                    *p = Point2::from((*p - min) / scale);
                }
            }
        }
        Fill::Stretch => {
            for p in uvs.iter_mut() {
                let d = *p - min;
                *p = Point2::new(
                    if extent.x > TOLERANCE { d.x / extent.x } else { d.x },
                    if extent.y > TOLERANCE { d.y / extent.y } else { d.y },
                );
            }
        }
    }

    if settings.swap_uv {
        for p in uvs.iter_mut() {
            *p = Point2::new(p.y, p.x);
        }
    }

    if settings.rotation.abs() > TOLERANCE {
        if let Some((min, max)) = bounds(uvs) {
            let center = nalgebra::center(&min, &max);
            let (sin, cos) = settings.rotation.to_radians().sin_cos();
            for p in uvs.iter_mut() {
                let d = *p - center;
                *p = center + Vector2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos);
            }
        }
    }

    if settings.flip_u || settings.flip_v {
        for p in uvs.iter_mut() {
            if settings.flip_u {
                p.x = -p.x;
            }
            if settings.flip_v {
                p.y = -p.y;
            }
        }
    }

    for p in uvs.iter_mut() {
        p.x *= settings.scale.x;
        p.y *= settings.scale.y;
    }

    if let Some(target) = anchor_point(settings.anchor) {
        if let Some((min, max)) = bounds(uvs) {
            let source = Point2::new(
                min.x + (max.x - min.x) * target.x,
                min.y + (max.y - min.y) * target.y,
            );
            let shift = target - source;
            for p in uvs.iter_mut() {
                *p += shift;
            }
        }
    }

    for p in uvs.iter_mut() {
        *p -= settings.offset;
    }
}

/// Position of an anchor in the unit square.
fn anchor_point(anchor: Anchor) -> Option<Point2> {
    let (x, y) = match anchor {
        Anchor::UpperLeft => (0.0, 1.0),
        Anchor::UpperCenter => (0.5, 1.0),
        Anchor::UpperRight => (1.0, 1.0),
        Anchor::MiddleLeft => (0.0, 0.5),
        Anchor::MiddleCenter => (0.5, 0.5),
        Anchor::MiddleRight => (1.0, 0.5),
        Anchor::LowerLeft => (0.0, 0.0),
        Anchor::LowerCenter => (0.5, 0.0),
        Anchor::LowerRight => (1.0, 0.0),
        Anchor::None => return None,
    };
    Some(Point2::new(x, y))
}

/// Editable two-component UV channel of a vertex: 0 is the primary set,
/// 1 the lightmap set.
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidChannel`] for any other channel.
pub fn channel_mut(vertex: &mut Vertex, channel: usize) -> Result<&mut Vector2> {
    match channel {
        0 => Ok(&mut vertex.uv0),
        1 => Ok(&mut vertex.uv2),
        other => Err(ProjectionError::InvalidChannel(other).into()),
    }
}

/// Reads a UV channel, see [`channel_mut`].
///
/// # Errors
///
/// Returns [`ProjectionError::InvalidChannel`] for channels other than 0
/// and 1.
pub fn channel(vertex: &Vertex, channel: usize) -> Result<Vector2> {
    match channel {
        0 => Ok(vertex.uv0),
        1 => Ok(vertex.uv2),
        other => Err(ProjectionError::InvalidChannel(other).into()),
    }
}
