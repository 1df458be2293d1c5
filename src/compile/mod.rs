//! Render output: vertex normals and tangents, compiled GPU-ready buffers and
//! the optimizer that splits oversized meshes.

mod build;
mod normals;
mod optimize;
mod tangents;

pub use build::Compile;
pub use normals::RecomputeNormals;
pub use optimize::{Optimize, OptimizedPiece};
pub use tangents::RecomputeTangents;

use crate::mesh::MaterialId;

/// Default ceiling on render vertices per compiled piece.
pub const DEFAULT_MAX_VERTICES: usize = 65_535;

/// Render-ready buffers of one mesh.
///
/// Every attribute buffer has one entry per render vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledMesh {
    /// Positions.
    pub positions: Vec<[f32; 3]>,
    /// Normals.
    pub normals: Vec<[f32; 3]>,
    /// Tangents with handedness in the last component.
    pub tangents: Vec<[f32; 4]>,
    /// RGBA colors.
    pub colors: Vec<[f32; 4]>,
    /// Primary UVs.
    pub uv0: Vec<[f32; 2]>,
    /// Lightmap UVs.
    pub uv2: Vec<[f32; 2]>,
    /// Third UV channel.
    pub uv3: Vec<[f32; 4]>,
    /// Fourth UV channel.
    pub uv4: Vec<[f32; 4]>,
    /// One triangle list per material, in order of first use.
    pub submeshes: Vec<Submesh>,
}

/// Triangles drawn with one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submesh {
    /// Material handle.
    pub material: MaterialId,
    /// Triangle indices into the render vertex buffers.
    pub triangles: Vec<[u32; 3]>,
}

impl CompiledMesh {
    /// Number of render vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles across all submeshes.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.triangles.len()).sum()
    }

    /// Bit pattern of every attribute of render vertex `i`, used to find
    /// identical vertices.
    fn key(&self, i: usize) -> Vec<u32> {
        let mut key = Vec::with_capacity(24);
        key.extend(self.positions[i].iter().map(|x| x.to_bits()));
        key.extend(self.normals[i].iter().map(|x| x.to_bits()));
        key.extend(self.tangents[i].iter().map(|x| x.to_bits()));
        key.extend(self.colors[i].iter().map(|x| x.to_bits()));
        key.extend(self.uv0[i].iter().map(|x| x.to_bits()));
        key.extend(self.uv2[i].iter().map(|x| x.to_bits()));
        key.extend(self.uv3[i].iter().map(|x| x.to_bits()));
        key.extend(self.uv4[i].iter().map(|x| x.to_bits()));
        key
    }

    /// Keeps only the render vertices at `kept`, in that order.
    fn retain_vertices(&mut self, kept: &[usize]) {
        fn pick<T: Copy>(buffer: &mut Vec<T>, kept: &[usize]) {
            *buffer = kept.iter().map(|&i| buffer[i]).collect();
        }
        pick(&mut self.positions, kept);
        pick(&mut self.normals, kept);
        pick(&mut self.tangents, kept);
        pick(&mut self.colors, kept);
        pick(&mut self.uv0, kept);
        pick(&mut self.uv2, kept);
        pick(&mut self.uv3, kept);
        pick(&mut self.uv4, kept);
    }
}
