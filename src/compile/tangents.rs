use tracing::debug;

use crate::error::Result;
use crate::math::{try_normalize, Vector3, Vector4, TOLERANCE};
use crate::mesh::Mesh;

/// Rewrites every vertex tangent from positions and primary UVs.
///
/// Tangent and bitangent directions are accumulated per triangle, the tangent
/// is made orthogonal to the vertex normal, and `w` holds the handedness
/// `sign(dot(cross(n, t), bitangent))`. Run after [`super::RecomputeNormals`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RecomputeTangents;

impl RecomputeTangents {
    /// Creates a new `RecomputeTangents` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the recomputation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] if a face holds a
    /// stale vertex index.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<()> {
        let n = mesh.vertex_count();
        let mut tangents = vec![Vector3::zeros(); n];
        let mut bitangents = vec![Vector3::zeros(); n];
        let mut skipped = 0usize;

        for face in mesh.faces() {
            for [a, b, c] in face.triangles() {
                let (va, vb, vc) = (mesh.vertex(a)?, mesh.vertex(b)?, mesh.vertex(c)?);
                let e1 = vb.position - va.position;
                let e2 = vc.position - va.position;
                let d1 = vb.uv0 - va.uv0;
                let d2 = vc.uv0 - va.uv0;
                let det = d1.x * d2.y - d2.x * d1.y;
                if det.abs() < TOLERANCE {
                    skipped += 1;
                    continue;
                }
                let r = 1.0 / det;
                let t = (e1 * d2.y - e2 * d1.y) * r;
                let s = (e2 * d1.x - e1 * d2.x) * r;
                for v in [a, b, c] {
                    tangents[v] += t;
                    bitangents[v] += s;
                }
            }
        }

        for (v, vertex) in mesh.vertices_mut().iter_mut().enumerate() {
            let normal = vertex.normal;
            let Some(t) = gram_schmidt(&tangents[v], &normal) else {
                continue;
            };
            let w = if normal.cross(&t).dot(&bitangents[v]) < 0.0 { -1.0 } else { 1.0 };
            vertex.tangent = Vector4::new(t.x, t.y, t.z, w);
        }
        if skipped > 0 {
            debug!(skipped, "skipped triangles with degenerate uvs");
        }
        Ok(())
    }
}

/// `tangent` with its `normal` component removed, normalized. `None` when
/// the tangent is parallel to the normal.
pub(super) fn gram_schmidt(tangent: &Vector3, normal: &Vector3) -> Option<Vector3> {
    try_normalize(&(tangent - normal * normal.dot(tangent)))
}
