use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{Declined, Outcome, Result};
use crate::math::{Point2, Point3, Vector2, TOLERANCE};
use crate::mesh::Mesh;
use crate::operations::{distinct, transact};
use crate::shared::cluster_points;

use super::auto::RefreshAutoUvs;
use super::project::{bounds, channel, channel_mut};

/// Marks every face touching `indices` as manual so the next auto refresh
/// keeps the edited coordinates.
fn pin_faces(mesh: &mut Mesh, indices: &[usize]) {
    let touched: BTreeSet<usize> = indices.iter().copied().collect();
    for f in 0..mesh.face_count() {
        let hit = mesh.faces()[f]
            .distinct_indices()
            .iter()
            .any(|i| touched.contains(i));
        if hit {
            if let Ok(face) = mesh.face_mut(f) {
                face.manual_uv = true;
            }
        }
    }
}

fn read_uvs(mesh: &Mesh, indices: &[usize], ch: usize) -> Result<Vec<Point2>> {
    indices
        .iter()
        .map(|&i| Ok(Point2::from(channel(mesh.vertex(i)?, ch)?)))
        .collect()
}

fn write_uvs(mesh: &mut Mesh, indices: &[usize], uvs: &[Point2], ch: usize) -> Result<()> {
    mesh.check_vertices(indices)?;
    for (&i, uv) in indices.iter().zip(uvs) {
        *channel_mut(&mut mesh.vertices_mut()[i], ch)? = uv.coords;
    }
    Ok(())
}

/// Rescales the UV bounds of a vertex subset into the unit square: the
/// subset is translated by its minimum and divided by its larger extent.
#[derive(Debug, Clone)]
pub struct FitUvs {
    indices: Vec<usize>,
    channel: usize,
}

impl FitUvs {
    /// Creates a new `FitUvs` operation on the primary channel.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
            channel: 0,
        }
    }

    /// Operates on UV channel `channel` (0 primary, 1 lightmap).
    #[must_use]
    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Executes the fit.
    ///
    /// Declines when the subset has no extent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex and [`crate::error::ProjectionError::InvalidChannel`] for an
    /// unsupported channel.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        transact(mesh, |work| {
            let uvs = read_uvs(work, &self.indices, self.channel)?;
            let Some((min, max)) = bounds(&uvs) else {
                return Ok(Declined::EmptySelection.into());
            };
            let extent = max - min;
            let scale = extent.x.max(extent.y);
            if scale < TOLERANCE {
                return Ok(Declined::NothingToDo.into());
            }
            let fitted: Vec<Point2> = uvs.iter().map(|p| Point2::from((p - min) / scale)).collect();
            write_uvs(work, &self.indices, &fitted, self.channel)?;
            pin_faces(work, &self.indices);
            Ok(Outcome::Applied(()))
        })
    }
}

/// Direction of a UV flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirror U across the vertical line through the bounds center.
    Horizontal,
    /// Mirror V across the horizontal line through the bounds center.
    Vertical,
}

/// Mirrors a UV subset across a line through its bounds center.
#[derive(Debug, Clone)]
pub struct FlipUvs {
    indices: Vec<usize>,
    axis: FlipAxis,
}

impl FlipUvs {
    /// Creates a new `FlipUvs` operation on the primary channel.
    #[must_use]
    pub fn new(indices: &[usize], axis: FlipAxis) -> Self {
        Self {
            indices: distinct(indices),
            axis,
        }
    }

    /// Executes the flip.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        transact(mesh, |work| {
            let uvs = read_uvs(work, &self.indices, 0)?;
            let Some((min, max)) = bounds(&uvs) else {
                return Ok(Declined::EmptySelection.into());
            };
            let center = nalgebra::center(&min, &max);
            let flipped: Vec<Point2> = uvs
                .iter()
                .map(|p| match self.axis {
                    FlipAxis::Horizontal => Point2::new(2.0 * center.x - p.x, p.y),
                    FlipAxis::Vertical => Point2::new(p.x, 2.0 * center.y - p.y),
                })
                .collect();
            write_uvs(work, &self.indices, &flipped, 0)?;
            pin_faces(work, &self.indices);
            Ok(Outcome::Applied(()))
        })
    }
}

/// Translates a UV subset so its bounds center sits at `(0.5, 0.5)`.
#[derive(Debug, Clone)]
pub struct CenterUvs {
    indices: Vec<usize>,
}

impl CenterUvs {
    /// Creates a new `CenterUvs` operation on the primary channel.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
        }
    }

    /// Executes the translation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        transact(mesh, |work| {
            let uvs = read_uvs(work, &self.indices, 0)?;
            let Some((min, max)) = bounds(&uvs) else {
                return Ok(Declined::EmptySelection.into());
            };
            let shift = Point2::new(0.5, 0.5) - nalgebra::center(&min, &max);
            let moved: Vec<Point2> = uvs.iter().map(|p| p + shift).collect();
            write_uvs(work, &self.indices, &moved, 0)?;
            pin_faces(work, &self.indices);
            Ok(Outcome::Applied(()))
        })
    }
}

/// Gives each vertex its own UV identity, breaking UV welds.
#[derive(Debug, Clone)]
pub struct SplitUvs {
    indices: Vec<usize>,
}

impl SplitUvs {
    /// Creates a new `SplitUvs` operation.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
        }
    }

    /// Executes the split; declines when every vertex is already alone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_vertices(&self.indices)?;
        transact(mesh, |work| {
            let welded: Vec<usize> = self
                .indices
                .iter()
                .copied()
                .filter(|&i| work.shared_textures().coincident(i).len() > 1)
                .collect();
            if welded.is_empty() {
                return Ok(Declined::NothingToDo.into());
            }
            for &i in &welded {
                work.shared_textures_mut().detach(i);
            }
            debug!(split = welded.len(), "split uvs");
            Ok(Outcome::Applied(()))
        })
    }
}

/// Moves a UV subset to its average and welds it into one UV group.
#[derive(Debug, Clone)]
pub struct CollapseUvs {
    indices: Vec<usize>,
}

impl CollapseUvs {
    /// Creates a new `CollapseUvs` operation on the primary channel.
    #[must_use]
    pub fn new(indices: &[usize]) -> Self {
        Self {
            indices: distinct(indices),
        }
    }

    /// Executes the collapse; declines for fewer than two vertices.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.len() < 2 {
            return Ok(Declined::NothingToDo.into());
        }
        transact(mesh, |work| {
            let uvs = read_uvs(work, &self.indices, 0)?;
            let sum = uvs.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords);
            #[allow(clippy::cast_precision_loss)]
            let average = Point2::from(sum / uvs.len() as f64);
            write_uvs(work, &self.indices, &vec![average; uvs.len()], 0)?;
            work.shared_textures_mut().merge(&self.indices);
            pin_faces(work, &self.indices);
            Ok(Outcome::Applied(()))
        })
    }
}

/// Welds UVs of a subset that lie within `distance` of each other,
/// transitively, moving each cluster to its average.
#[derive(Debug, Clone)]
pub struct SewUvs {
    indices: Vec<usize>,
    distance: f64,
}

impl SewUvs {
    /// Creates a new `SewUvs` operation on the primary channel.
    #[must_use]
    pub fn new(indices: &[usize], distance: f64) -> Self {
        Self {
            indices: distinct(indices),
            distance,
        }
    }

    /// Executes the sew; declines when no two UVs are close enough.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale
    /// vertex.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.indices.len() < 2 {
            return Ok(Declined::NothingToDo.into());
        }
        transact(mesh, |work| {
            let uvs = read_uvs(work, &self.indices, 0)?;
            let points: Vec<Point3> = uvs.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
            let roots = cluster_points(&points, self.distance, true);
            let mut sewn = 0;
            let mut out = uvs.clone();
            for root in roots.iter().copied().collect::<BTreeSet<_>>() {
                let members: Vec<usize> = (0..roots.len()).filter(|&k| roots[k] == root).collect();
                if members.len() < 2 {
                    continue;
                }
                let sum = members.iter().fold(Vector2::zeros(), |acc, &k| acc + uvs[k].coords);
                #[allow(clippy::cast_precision_loss)]
                let average = Point2::from(sum / members.len() as f64);
                for &k in &members {
                    out[k] = average;
                }
                let vertices: Vec<usize> = members.iter().map(|&k| self.indices[k]).collect();
                work.shared_textures_mut().merge(&vertices);
                sewn += 1;
            }
            if sewn == 0 {
                return Ok(Declined::NothingToDo.into());
            }
            write_uvs(work, &self.indices, &out, 0)?;
            pin_faces(work, &self.indices);
            info!(clusters = sewn, "sewed uvs");
            Ok(Outcome::Applied(()))
        })
    }
}

/// Switches faces between auto and manual UVs.
#[derive(Debug, Clone)]
pub struct SetUvMode {
    faces: Vec<usize>,
    manual: bool,
}

impl SetUvMode {
    /// Makes faces auto-UV and re-projects them.
    #[must_use]
    pub fn auto(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
            manual: false,
        }
    }

    /// Makes faces manual, freezing their current UVs.
    #[must_use]
    pub fn manual(faces: &[usize]) -> Self {
        Self {
            faces: faces.to_vec(),
            manual: true,
        }
    }

    /// Executes the switch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale face.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<Outcome<()>> {
        if self.faces.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        mesh.check_faces(&self.faces)?;
        transact(mesh, |work| {
            if self.faces.iter().all(|&f| work.faces()[f].manual_uv == self.manual) {
                return Ok(Declined::NothingToDo.into());
            }
            for &f in &self.faces {
                work.face_mut(f)?.manual_uv = self.manual;
            }
            if !self.manual {
                RefreshAutoUvs::new().execute(work)?;
            }
            Ok(Outcome::Applied(()))
        })
    }
}
