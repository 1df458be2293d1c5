use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::error::{CompileError, Result};
use crate::mesh::{Face, Mesh};

use super::normals::SmoothKey;
use super::{Compile, CompiledMesh, DEFAULT_MAX_VERTICES};

/// One piece of an optimized mesh.
///
/// `mesh` is the editable piece the buffers were compiled from. Its shared
/// vertex and shared texture groups are those of the source mesh restricted
/// to the piece, so welds and UV groups survive the split.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedPiece {
    /// Editable piece, re-indexed from zero.
    pub mesh: Mesh,
    /// Render buffers of `mesh`.
    pub compiled: CompiledMesh,
}

/// Prepares a mesh for rendering.
///
/// Degenerate triangles and unused vertices are dropped, the mesh is split
/// along face boundaries into pieces of at most `max_vertices` render
/// vertices, and each piece is compiled with identical render vertices
/// collapsed.
#[derive(Debug, Clone, Copy)]
pub struct Optimize {
    max_vertices: usize,
}

impl Default for Optimize {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
        }
    }
}

impl Optimize {
    /// Creates a new `Optimize` operation with the default ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the render vertex ceiling per piece.
    #[must_use]
    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    /// Executes the optimization and returns the pieces in face order.
    /// The input mesh is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidVertexCeiling`] for a ceiling below 3,
    /// [`CompileError::Failed`] if a single face needs more render vertices
    /// than the ceiling, or a [`crate::error::MeshError`] if the mesh fails
    /// validation.
    pub fn execute(&self, mesh: &Mesh) -> Result<Vec<OptimizedPiece>> {
        if self.max_vertices < 3 {
            return Err(CompileError::InvalidVertexCeiling(self.max_vertices).into());
        }
        mesh.validate()?;
        let mut work = mesh.clone();
        work.prune_degenerate();
        work.remove_unused_vertices();

        let pieces = if render_vertex_count(&work) > self.max_vertices {
            self.split(&work)?
        } else {
            vec![work]
        };

        let mut out = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let mut compiled = Compile::new().execute(&piece)?;
            let collapsed = collapse_identical(&mut compiled);
            if compiled.vertex_count() > self.max_vertices {
                return Err(CompileError::Failed(format!(
                    "piece compiled to {} render vertices, ceiling is {}",
                    compiled.vertex_count(),
                    self.max_vertices
                ))
                .into());
            }
            debug!(collapsed, vertices = compiled.vertex_count(), "optimized piece");
            out.push(OptimizedPiece {
                mesh: piece,
                compiled,
            });
        }
        info!(pieces = out.len(), "optimize mesh");
        Ok(out)
    }

    /// Greedily packs faces, in order, into pieces under the ceiling.
    fn split(&self, mesh: &Mesh) -> Result<Vec<Mesh>> {
        let mut pieces = Vec::new();
        let mut faces = Vec::new();
        let mut used = BTreeSet::new();
        for (f, face) in mesh.faces().iter().enumerate() {
            let corners: Vec<(usize, SmoothKey)> = render_corners(f, face).collect();
            if corners.len() > self.max_vertices {
                return Err(CompileError::Failed(format!(
                    "face {f} needs {} render vertices, ceiling is {}",
                    corners.len(),
                    self.max_vertices
                ))
                .into());
            }
            let added = corners.iter().filter(|c| !used.contains(*c)).count();
            if used.len() + added > self.max_vertices {
                pieces.push(mesh.extract(&faces)?);
                faces.clear();
                used.clear();
            }
            faces.push(f);
            used.extend(corners);
        }
        if !faces.is_empty() {
            pieces.push(mesh.extract(&faces)?);
        }
        debug!(pieces = pieces.len(), ceiling = self.max_vertices, "split mesh");
        Ok(pieces)
    }
}

/// Render vertices face `f` emits: one per record under its smoothing key.
fn render_corners(f: usize, face: &Face) -> impl Iterator<Item = (usize, SmoothKey)> + '_ {
    let key = SmoothKey::of(f, face);
    face.distinct_indices().iter().map(move |&v| (v, key))
}

/// Render vertices [`Compile`] emits for the whole mesh.
fn render_vertex_count(mesh: &Mesh) -> usize {
    mesh.faces()
        .iter()
        .enumerate()
        .flat_map(|(f, face)| render_corners(f, face))
        .collect::<BTreeSet<_>>()
        .len()
}

/// Merges render vertices whose every attribute is bit-identical and
/// returns how many were removed.
fn collapse_identical(compiled: &mut CompiledMesh) -> usize {
    let before = compiled.vertex_count();
    let mut first: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut kept = Vec::with_capacity(before);
    let mut remap = Vec::with_capacity(before);
    for i in 0..before {
        let next = u32::try_from(kept.len()).unwrap_or(u32::MAX);
        let target = *first.entry(compiled.key(i)).or_insert(next);
        if target == next {
            kept.push(i);
        }
        remap.push(target);
    }
    compiled.retain_vertices(&kept);
    for submesh in &mut compiled.submeshes {
        for tri in &mut submesh.triangles {
            for index in tri.iter_mut() {
                if let Some(&to) = usize::try_from(*index).ok().and_then(|i| remap.get(i)) {
                    *index = to;
                }
            }
        }
    }
    before - kept.len()
}
