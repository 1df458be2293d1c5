//! Topology-mutating operations.
//!
//! Every operation runs on a working copy of the mesh and commits it only
//! when the result is [`Outcome::Applied`]. A declined or failed operation
//! leaves the caller's mesh exactly as it was.

mod bridge;
mod combine;
mod connect;
mod delete;
mod extrude;
mod flip;
mod pivot;
mod subdivide;
mod weld;

pub use bridge::Bridge;
pub use combine::CombineMeshes;
pub use connect::{ConnectEdges, ConnectVertices, InsertEdgeLoop};
pub use delete::{DeleteFaces, DetachFaces, DetachTarget, Detached};
pub use extrude::{ExtrudeEdges, ExtrudeFaces};
pub use flip::FlipNormals;
pub use pivot::SetPivot;
pub use subdivide::SubdivideFaces;
pub use weld::{Collapse, Split, Weld, Welded};

use crate::error::{Outcome, Result};
use crate::mesh::{Face, Mesh};
use crate::uv::RefreshAutoUvs;

/// Runs `f` on a clone of `mesh` and commits the clone only if `f` returns
/// an applied outcome.
pub(crate) fn transact<T>(
    mesh: &mut Mesh,
    f: impl FnOnce(&mut Mesh) -> Result<Outcome<T>>,
) -> Result<Outcome<T>> {
    let mut work = mesh.clone();
    let outcome = f(&mut work)?;
    if outcome.is_applied() {
        *mesh = work;
    }
    Ok(outcome)
}

/// Index remaps produced by [`finish`].
#[derive(Debug, Clone)]
pub(crate) struct Compaction {
    pub faces: Vec<Option<usize>>,
    pub vertices: Vec<Option<usize>>,
}

impl Compaction {
    pub(crate) fn face(&self, f: usize) -> Option<usize> {
        self.faces.get(f).copied().flatten()
    }

    pub(crate) fn vertex(&self, v: usize) -> Option<usize> {
        self.vertices.get(v).copied().flatten()
    }

    pub(crate) fn faces_of(&self, faces: &[usize]) -> Vec<usize> {
        faces.iter().filter_map(|&f| self.face(f)).collect()
    }
}

/// Common tail of geometry operations: prunes degenerate triangles, drops
/// unreferenced vertices and re-projects auto UVs.
pub(crate) fn finish(work: &mut Mesh) -> Result<Compaction> {
    let faces = work.prune_degenerate();
    let vertices = work.remove_unused_vertices();
    RefreshAutoUvs::new().execute(work)?;
    Ok(Compaction { faces, vertices })
}

/// Metadata template for the pieces of split face `f`.
///
/// Pieces of an ungrouped auto-UV face share their cut records, so they get
/// one fresh texture group and are projected together.
pub(crate) fn split_template(mesh: &Mesh, f: usize) -> Result<Face> {
    let mut parent = mesh.face(f)?.clone();
    if !parent.manual_uv && parent.texture_group <= 0 {
        parent.texture_group = mesh.unused_texture_group();
    }
    Ok(parent)
}

/// Sorted, deduplicated copy of an index list.
pub(crate) fn distinct(indices: &[usize]) -> Vec<usize> {
    let mut out = indices.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}
