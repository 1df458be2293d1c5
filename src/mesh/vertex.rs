use crate::math::{Point3, Vector2, Vector3, Vector4};

/// A mesh vertex with every render attribute.
///
/// Vertices are identified by their index in the owning mesh's flat vertex
/// array; they carry no back-references to faces or groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Local-space position.
    pub position: Point3,
    /// Vertex normal. Rewritten by normal recomputation.
    pub normal: Vector3,
    /// Tangent with handedness in `w`.
    pub tangent: Vector4,
    /// RGBA color.
    pub color: Vector4,
    /// Primary texture coordinates.
    pub uv0: Vector2,
    /// Secondary (lightmap) texture coordinates.
    pub uv2: Vector2,
    /// Third UV channel.
    pub uv3: Vector4,
    /// Fourth UV channel.
    pub uv4: Vector4,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            normal: Vector3::zeros(),
            tangent: Vector4::new(1.0, 0.0, 0.0, 1.0),
            color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            uv0: Vector2::zeros(),
            uv2: Vector2::zeros(),
            uv3: Vector4::zeros(),
            uv4: Vector4::zeros(),
        }
    }
}

impl Vertex {
    /// Creates a vertex at `position` with default attributes.
    #[must_use]
    pub fn new(position: Point3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Returns this vertex with primary UVs set.
    #[must_use]
    pub fn with_uv0(mut self, uv: Vector2) -> Self {
        self.uv0 = uv;
        self
    }

    /// Linearly interpolates every attribute towards `other`.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            position: self.position + (other.position - self.position) * t,
            normal: self.normal.lerp(&other.normal, t),
            tangent: self.tangent.lerp(&other.tangent, t),
            color: self.color.lerp(&other.color, t),
            uv0: self.uv0.lerp(&other.uv0, t),
            uv2: self.uv2.lerp(&other.uv2, t),
            uv3: self.uv3.lerp(&other.uv3, t),
            uv4: self.uv4.lerp(&other.uv4, t),
        }
    }

    /// Averages every attribute of a set of vertices.
    ///
    /// Returns `None` for an empty set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> Option<Self> {
        let mut sum = Self {
            position: Point3::origin(),
            normal: Vector3::zeros(),
            tangent: Vector4::zeros(),
            color: Vector4::zeros(),
            ..Self::default()
        };
        let mut count = 0usize;
        for v in vertices {
            sum.position.coords += v.position.coords;
            sum.normal += v.normal;
            sum.tangent += v.tangent;
            sum.color += v.color;
            sum.uv0 += v.uv0;
            sum.uv2 += v.uv2;
            sum.uv3 += v.uv3;
            sum.uv4 += v.uv4;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let k = 1.0 / count as f64;
        Some(Self {
            position: Point3::from(sum.position.coords * k),
            normal: sum.normal * k,
            tangent: sum.tangent * k,
            color: sum.color * k,
            uv0: sum.uv0 * k,
            uv2: sum.uv2 * k,
            uv3: sum.uv3 * k,
            uv4: sum.uv4 * k,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn lerp_midpoint_interpolates_all_channels() {
        let a = Vertex::new(Point3::new(0.0, 0.0, 0.0)).with_uv0(Vector2::new(0.0, 0.0));
        let b = Vertex::new(Point3::new(2.0, 0.0, 0.0)).with_uv0(Vector2::new(1.0, 1.0));
        let m = a.lerp(&b, 0.5);
        assert_relative_eq!(m.position, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(m.uv0, Vector2::new(0.5, 0.5));
        assert_relative_eq!(m.color, Vector4::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert!(Vertex::average(std::iter::empty()).is_none());
    }

    #[test]
    fn average_of_square_is_center() {
        let verts = [
            Vertex::new(Point3::new(0.0, 0.0, 0.0)),
            Vertex::new(Point3::new(2.0, 0.0, 0.0)),
            Vertex::new(Point3::new(2.0, 2.0, 0.0)),
            Vertex::new(Point3::new(0.0, 2.0, 0.0)),
        ];
        let avg = Vertex::average(&verts).unwrap();
        assert_relative_eq!(avg.position, Point3::new(1.0, 1.0, 0.0));
    }
}
