//! Primitive shape builders.

use super::{Face, Mesh, Vertex};
use crate::math::{Point3, Vector2};

/// Weld distance used by the builders.
const WELD_EPSILON: f64 = 1e-5;

const QUAD_UVS: [(f64, f64); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

/// An axis-aligned cube of edge `size` centered at the origin.
///
/// Each side owns four vertices (24 in total) so sides can carry their own
/// UVs and normals; coincident corners are welded. Sides are ordered
/// `+Z, -Z, +X, -X, +Y, -Y`, each wound counter-clockwise seen from outside.
#[must_use]
pub fn cube(size: f64) -> Mesh {
    let h = size * 0.5;
    let sides: [[(f64, f64, f64); 4]; 6] = [
        [(-h, -h, h), (h, -h, h), (h, h, h), (-h, h, h)],
        [(h, -h, -h), (-h, -h, -h), (-h, h, -h), (h, h, -h)],
        [(h, -h, h), (h, -h, -h), (h, h, -h), (h, h, h)],
        [(-h, -h, -h), (-h, -h, h), (-h, h, h), (-h, h, -h)],
        [(-h, h, h), (h, h, h), (h, h, -h), (-h, h, -h)],
        [(-h, -h, -h), (h, -h, -h), (h, -h, h), (-h, -h, h)],
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut faces = Vec::with_capacity(6);
    for side in &sides {
        let base = vertices.len();
        for (&(x, y, z), &(u, v)) in side.iter().zip(&QUAD_UVS) {
            vertices.push(Vertex::new(Point3::new(x, y, z)).with_uv0(Vector2::new(u, v)));
        }
        faces.push(Face::quad(base, base + 1, base + 2, base + 3));
    }
    let mut mesh = Mesh::new(vertices, faces);
    mesh.rebuild_shared_vertices(WELD_EPSILON);
    mesh
}

/// A grid of `width_cuts x height_cuts` quads on the XZ plane facing +Y,
/// centered at the origin.
///
/// Every quad owns its four vertices; shared grid points are welded.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn plane(width: f64, height: f64, width_cuts: usize, height_cuts: usize) -> Mesh {
    let (wc, hc) = (width_cuts.max(1), height_cuts.max(1));
    let (dx, dz) = (width / wc as f64, height / hc as f64);
    let (x0, z0) = (-width * 0.5, -height * 0.5);
    let mut vertices = Vec::with_capacity(wc * hc * 4);
    let mut faces = Vec::with_capacity(wc * hc);
    for row in 0..hc {
        for col in 0..wc {
            let (xa, xb) = (x0 + dx * col as f64, x0 + dx * (col + 1) as f64);
            let (za, zb) = (z0 + dz * row as f64, z0 + dz * (row + 1) as f64);
            let base = vertices.len();
            for (x, z) in [(xa, zb), (xb, zb), (xb, za), (xa, za)] {
                let uv = Vector2::new(
                    (x - x0) / width.max(f64::EPSILON),
                    (z - z0) / height.max(f64::EPSILON),
                );
                vertices.push(Vertex::new(Point3::new(x, 0.0, z)).with_uv0(uv));
            }
            faces.push(Face::quad(base, base + 1, base + 2, base + 3));
        }
    }
    let mut mesh = Mesh::new(vertices, faces);
    mesh.rebuild_shared_vertices(WELD_EPSILON.min(dx.min(dz) * 0.5));
    mesh
}
