use std::collections::BTreeMap;

use tracing::info;

use crate::error::{CompileError, Result};
use crate::math::Vector4;
use crate::mesh::Mesh;

use super::normals::{corner_normals, SmoothKey};
use super::tangents::gram_schmidt;
use super::{CompiledMesh, Submesh};

/// Compiles a mesh into render buffers.
///
/// One render vertex is emitted per `(vertex record, smoothing key)` pair, so
/// a record shared by a hard face and its neighbors becomes several render
/// vertices with their own normals. Stored tangents are re-orthogonalized
/// against each render vertex's normal. Triangles are grouped into one
/// submesh per material.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compile;

impl Compile {
    /// Creates a new `Compile` operation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the compilation.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::MeshError`] if the mesh fails validation,
    /// or [`CompileError::Failed`] if the render vertex count does not fit
    /// 32-bit indices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self, mesh: &Mesh) -> Result<CompiledMesh> {
        mesh.validate()?;
        let normals = corner_normals(mesh)?;
        let mut out = CompiledMesh::default();
        let mut emitted: BTreeMap<(usize, SmoothKey), u32> = BTreeMap::new();

        for (f, face) in mesh.faces().iter().enumerate() {
            let key = SmoothKey::of(f, face);
            let mut triangles = Vec::with_capacity(face.triangle_count());
            for tri in face.triangles() {
                let mut indices = [0u32; 3];
                for (slot, v) in indices.iter_mut().zip(tri) {
                    *slot = match emitted.get(&(v, key)) {
                        Some(&i) => i,
                        None => {
                            let i = u32::try_from(out.vertex_count()).map_err(|_| {
                                CompileError::Failed("too many render vertices for u32".into())
                            })?;
                            let vertex = mesh.vertex(v)?;
                            let normal = normals.get(&(v, key)).copied().unwrap_or(vertex.normal);
                            let p = vertex.position;
                            let t = vertex.tangent;
                            let t = gram_schmidt(&t.xyz(), &normal)
                                .map_or(t, |d| Vector4::new(d.x, d.y, d.z, t.w));
                            let c = vertex.color;
                            out.positions.push([p.x as f32, p.y as f32, p.z as f32]);
                            out.normals.push([normal.x as f32, normal.y as f32, normal.z as f32]);
                            out.tangents.push([t.x as f32, t.y as f32, t.z as f32, t.w as f32]);
                            out.colors.push([c.x as f32, c.y as f32, c.z as f32, c.w as f32]);
                            out.uv0.push([vertex.uv0.x as f32, vertex.uv0.y as f32]);
                            out.uv2.push([vertex.uv2.x as f32, vertex.uv2.y as f32]);
                            let (u3, u4) = (vertex.uv3, vertex.uv4);
                            out.uv3.push([u3.x as f32, u3.y as f32, u3.z as f32, u3.w as f32]);
                            out.uv4.push([u4.x as f32, u4.y as f32, u4.z as f32, u4.w as f32]);
                            emitted.insert((v, key), i);
                            i
                        }
                    };
                }
                triangles.push(indices);
            }
            match out.submeshes.iter_mut().find(|s| s.material == face.material) {
                Some(submesh) => submesh.triangles.extend(triangles),
                None => out.submeshes.push(Submesh {
                    material: face.material,
                    triangles,
                }),
            }
        }
        info!(
            vertices = out.vertex_count(),
            triangles = out.triangle_count(),
            submeshes = out.submeshes.len(),
            "compiled mesh"
        );
        Ok(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;
    use slotmap::SlotMap;

    use super::*;
    use crate::math::Point3;
    use crate::mesh::{shapes, Face, MaterialId, Vertex};

    fn triangle_pair() -> Mesh {
        let vertices = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|&(x, y)| Vertex::new(Point3::new(x, y, 0.0)))
            .collect();
        Mesh::new(vertices, vec![Face::triangle(0, 1, 2), Face::triangle(2, 1, 3)])
    }

    #[test]
    fn cube_compiles_to_one_submesh() {
        let compiled = Compile::new().execute(&shapes::cube(1.0)).unwrap();
        assert_eq!(compiled.vertex_count(), 24);
        assert_eq!(compiled.triangle_count(), 12);
        assert_eq!(compiled.submeshes.len(), 1);
        assert_relative_eq!(compiled.normals[0][2], 1.0);
    }

    #[test]
    fn hard_edges_split_shared_records() {
        let mut mesh = triangle_pair();
        let hard = Compile::new().execute(&mesh).unwrap();
        assert_eq!(hard.vertex_count(), 6);

        mesh.face_mut(0).unwrap().smoothing_group = 1;
        mesh.face_mut(1).unwrap().smoothing_group = 1;
        let smooth = Compile::new().execute(&mesh).unwrap();
        assert_eq!(smooth.vertex_count(), 4);
    }

    #[test]
    fn tangents_follow_hard_normals() {
        let vertices = [(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0), (1.0, 1.0, 1.0)]
            .iter()
            .map(|&(x, y, z)| {
                let mut vertex = Vertex::new(Point3::new(x, y, z));
                vertex.tangent = Vector4::new(1.0, 0.0, 0.0, 1.0);
                vertex
            })
            .collect();
        let mesh = Mesh::new(vertices, vec![Face::triangle(0, 1, 2), Face::triangle(2, 1, 3)]);
        let compiled = Compile::new().execute(&mesh).unwrap();
        assert_eq!(compiled.vertex_count(), 6);
        for (t, n) in compiled.tangents.iter().zip(&compiled.normals) {
            let dot = t[0] * n[0] + t[1] * n[1] + t[2] * n[2];
            let length = (t[0] * t[0] + t[1] * t[1] + t[2] * t[2]).sqrt();
            assert_relative_eq!(dot, 0.0, epsilon = 1e-6);
            assert_relative_eq!(length, 1.0, epsilon = 1e-6);
            assert_relative_eq!(t[3], 1.0);
        }
    }

    #[test]
    fn one_submesh_per_material() {
        let mut registry: SlotMap<MaterialId, &str> = SlotMap::with_key();
        let brick = registry.insert("brick");
        let mut cube = shapes::cube(1.0);
        cube.face_mut(2).unwrap().material = brick;
        cube.face_mut(4).unwrap().material = brick;
        let compiled = Compile::new().execute(&cube).unwrap();
        assert_eq!(compiled.submeshes.len(), 2);
        assert_eq!(compiled.submeshes[0].material, MaterialId::default());
        assert_eq!(compiled.submeshes[0].triangles.len(), 8);
        assert_eq!(compiled.submeshes[1].triangles.len(), 4);
    }

    #[test]
    fn malformed_mesh_is_rejected() {
        let mesh = Mesh::new(vec![Vertex::default(); 3], vec![Face::triangle(0, 1, 5)]);
        assert!(Compile::new().execute(&mesh).is_err());
    }
}
