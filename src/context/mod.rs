//! The editing session: settings plus dispatch of operations over a
//! selection of any element kind.

pub mod selection;

pub use selection::{EdgeSelection, FaceSelection, Selection, SelectionKind, VertexSelection};

use std::collections::BTreeSet;

use tracing::debug;

use crate::compile::{Optimize, OptimizedPiece, DEFAULT_MAX_VERTICES};
use crate::error::{Declined, Outcome, Result};
use crate::mesh::{Edge, Mesh};
use crate::operations::{
    Bridge, Collapse, ConnectEdges, ConnectVertices, DeleteFaces, DetachFaces, DetachTarget,
    Detached, ExtrudeEdges, ExtrudeFaces, SetPivot, Split, SubdivideFaces, Weld,
};
use crate::topology::{Adjacency, GrowSelection, NeighborFaces};
use crate::uv::{PlanarProject, SewUvs};

/// Smallest weld distance an edit accepts.
pub const MIN_WELD_DISTANCE: f64 = 1e-5;

/// Editor preferences read by the operations dispatched from an
/// [`EditContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditSettings {
    /// Distance under which vertices weld. Clamped to [`MIN_WELD_DISTANCE`].
    pub weld_distance: f64,
    /// Distance faces and edges move when extruded.
    pub extrude_distance: f64,
    /// Refuse to extrude edges that already have two faces.
    pub manifold_edge_extrusion: bool,
    /// Only bridge edges on the outer boundary loop.
    pub bridge_perimeter_only: bool,
    /// Maximum normal angle in degrees when growing a face selection.
    pub grow_angle: Option<f64>,
    /// Distance under which UVs are sewn together.
    pub uv_weld_distance: f64,
    /// Fit planar projections into the unit square.
    pub fit_on_planar_project: bool,
    /// Vertex ceiling of one optimized piece.
    pub max_vertices: usize,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            weld_distance: 0.01,
            extrude_distance: 0.5,
            manifold_edge_extrusion: true,
            bridge_perimeter_only: false,
            grow_angle: None,
            uv_weld_distance: 0.01,
            fit_on_planar_project: true,
            max_vertices: DEFAULT_MAX_VERTICES,
        }
    }
}

/// An editing session.
///
/// Owns the settings and routes each selection kind to the operation that
/// handles it. Results come back as selections for reselection.
#[derive(Debug, Clone, Default)]
pub struct EditContext {
    settings: EditSettings,
}

impl EditContext {
    /// Creates a context with the given settings.
    #[must_use]
    pub fn new(settings: EditSettings) -> Self {
        Self { settings }
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    /// Mutable access to the settings.
    pub fn settings_mut(&mut self) -> &mut EditSettings {
        &mut self.settings
    }

    /// The weld distance after clamping.
    #[must_use]
    pub fn weld_distance(&self) -> f64 {
        self.settings.weld_distance.max(MIN_WELD_DISTANCE)
    }

    // ── vertices ──

    /// Welds the selected vertices within the weld distance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn weld(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<Selection>> {
        let indices = checked_vertices(mesh, selection)?;
        if indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        let outcome = Weld::new(&indices, self.weld_distance()).execute(mesh)?;
        Ok(outcome.map(|welded| Selection::Vertices(welded.representatives)))
    }

    /// Collapses the selected vertices into one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn collapse(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<Selection>> {
        let indices = checked_vertices(mesh, selection)?;
        if indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        let outcome = Collapse::new(&indices).execute(mesh)?;
        Ok(outcome.map(|survivor| Selection::Vertices(survivor.into_iter().collect())))
    }

    /// Splits the selected vertices from their position groups.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn split(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<Selection>> {
        let indices = checked_vertices(mesh, selection)?;
        if indices.is_empty() {
            return Ok(Declined::EmptySelection.into());
        }
        Ok(Split::new(&indices).execute(mesh)?.map(Selection::Vertices))
    }

    // ── geometry ──

    /// Extrudes faces or edges by the extrude distance. Vertex selections
    /// have nothing to extrude.
    ///
    /// # Errors
    ///
    /// As the dispatched operation.
    pub fn extrude(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<Selection>> {
        let distance = self.settings.extrude_distance;
        Ok(match selection {
            Selection::Faces(faces) => ExtrudeFaces::new(faces, distance).execute(mesh)?.map(Selection::Faces),
            Selection::Edges(edges) => ExtrudeEdges::new(edges, distance, self.settings.manifold_edge_extrusion)
                .execute(mesh)?
                .map(Selection::Edges),
            Selection::Vertices(_) => Declined::NothingToDo.into(),
        })
    }

    /// Connects vertices or edges; connecting faces subdivides them.
    ///
    /// # Errors
    ///
    /// As the dispatched operation.
    pub fn connect(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<Selection>> {
        Ok(match selection {
            Selection::Vertices(vertices) => ConnectVertices::new(vertices).execute(mesh)?.map(Selection::Edges),
            Selection::Edges(edges) => ConnectEdges::new(edges).execute(mesh)?.map(Selection::Edges),
            Selection::Faces(faces) => SubdivideFaces::new(faces).execute(mesh)?.map(Selection::Faces),
        })
    }

    /// Bridges two open edges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn bridge(&self, mesh: &mut Mesh, a: Edge, b: Edge) -> Result<Outcome<Selection>> {
        let outcome = Bridge::new(a, b, self.settings.bridge_perimeter_only).execute(mesh)?;
        Ok(outcome.map(|f| Selection::Faces(vec![f])))
    }

    /// Deletes the selected faces, or every face touching the selected
    /// vertices or edges.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn delete(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<()>> {
        let faces = faces_of(mesh, selection)?;
        Ok(DeleteFaces::new(&faces).execute(mesh)?.map(|_| ()))
    }

    /// Detaches the faces of the selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn detach(&self, mesh: &mut Mesh, selection: &Selection, target: DetachTarget) -> Result<Outcome<Detached>> {
        let faces = faces_of(mesh, selection)?;
        DetachFaces::new(&faces, target).execute(mesh)
    }

    // ── selection ──

    /// Grows the selection by one step of neighboring faces, keeping its
    /// kind. Face selections honor the grow angle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn grow(&self, mesh: &Mesh, selection: &Selection) -> Result<Selection> {
        selection.check(mesh)?;
        Ok(match selection {
            Selection::Faces(faces) => Selection::Faces(GrowSelection::new(faces, self.settings.grow_angle).execute(mesh)?),
            Selection::Vertices(vertices) => {
                let faces = NeighborFaces::of_vertices(vertices).execute(mesh)?;
                Selection::Vertices(FaceSelection(faces).vertex_indices(mesh))
            }
            Selection::Edges(edges) => {
                let vertices = selection.vertex_indices(mesh);
                let faces = NeighborFaces::of_vertices(&vertices).execute(mesh)?;
                let adjacency = Adjacency::new(mesh);
                let mut seen = BTreeSet::new();
                let mut out: Vec<Edge> = edges.clone();
                for e in edges {
                    if let Some(common) = adjacency.common(e) {
                        seen.insert(common);
                    }
                }
                for &f in &faces {
                    for (local, common) in adjacency.face_edges(f) {
                        if seen.insert(*common) {
                            out.push(*local);
                        }
                    }
                }
                Selection::Edges(out)
            }
        })
    }

    // ── uv ──

    /// Planar-projects the faces of the selection, fitted when the settings
    /// ask for it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn planar_project(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<()>> {
        let faces = faces_of(mesh, selection)?;
        PlanarProject::new(&faces)
            .fitted(self.settings.fit_on_planar_project)
            .execute(mesh)
    }

    /// Sews the UVs of the selected vertices within the UV weld distance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn sew_uvs(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<()>> {
        let indices = checked_vertices(mesh, selection)?;
        SewUvs::new(&indices, self.settings.uv_weld_distance).execute(mesh)
    }

    /// Moves the mesh pivot to the center of the selection, or of the whole
    /// mesh for an empty selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MeshError::IndexOutOfRange`] for a stale index.
    pub fn set_pivot(&self, mesh: &mut Mesh, selection: &Selection) -> Result<Outcome<()>> {
        let indices = checked_vertices(mesh, selection)?;
        Ok(SetPivot::new(&indices).execute(mesh)?.map(|_| ()))
    }

    // ── output ──

    /// Optimizes and compiles the mesh under the vertex ceiling.
    ///
    /// # Errors
    ///
    /// As [`Optimize::execute`].
    pub fn compile(&self, mesh: &Mesh) -> Result<Vec<OptimizedPiece>> {
        Optimize::new().with_max_vertices(self.settings.max_vertices).execute(mesh)
    }
}

/// Checked vertex indices of the selection.
fn checked_vertices(mesh: &Mesh, selection: &Selection) -> Result<Vec<usize>> {
    selection.check(mesh)?;
    Ok(selection.vertex_indices(mesh))
}

/// Faces of a face selection, or faces holding a selected vertex or both
/// ends of a selected edge.
fn faces_of(mesh: &Mesh, selection: &Selection) -> Result<Vec<usize>> {
    selection.check(mesh)?;
    let faces = match selection {
        Selection::Faces(faces) => faces.clone(),
        Selection::Vertices(vertices) => mesh
            .faces()
            .iter()
            .enumerate()
            .filter(|(_, face)| vertices.iter().any(|&v| face.contains(v)))
            .map(|(f, _)| f)
            .collect(),
        Selection::Edges(edges) => {
            let adjacency = Adjacency::new(mesh);
            edges
                .iter()
                .filter_map(|e| adjacency.common(e))
                .flat_map(|common| adjacency.faces_of_edge(&common).to_vec())
                .collect()
        }
    };
    debug!(kind = selection.kind_name(), faces = faces.len(), "resolved faces of selection");
    Ok(faces)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Point3;
    use crate::mesh::shapes;
    use crate::shared::SharedGroups;

    #[test]
    fn default_settings() {
        let settings = EditSettings::default();
        assert_relative_eq!(settings.weld_distance, 0.01);
        assert_relative_eq!(settings.extrude_distance, 0.5);
        assert!(settings.manifold_edge_extrusion);
        assert!(!settings.bridge_perimeter_only);
        assert_eq!(settings.grow_angle, None);
        assert_eq!(settings.max_vertices, 65_535);
    }

    #[test]
    fn weld_distance_is_clamped() {
        let mut context = EditContext::default();
        context.settings_mut().weld_distance = 0.0;
        assert_relative_eq!(context.weld_distance(), MIN_WELD_DISTANCE);
    }

    #[test]
    fn weld_selection_of_unwelded_cube() {
        let mut cube = shapes::cube(1.0);
        cube.set_shared_vertices(SharedGroups::singletons(24)).unwrap();
        let all: Vec<usize> = (0..24).collect();
        let selection = EditContext::default()
            .weld(&mut cube, &Selection::Vertices(all))
            .unwrap()
            .applied()
            .unwrap();
        let Selection::Vertices(representatives) = selection else {
            panic!("expected vertices");
        };
        assert_eq!(representatives.len(), 8);
        assert_eq!(cube.shared_vertices().len(), 8);
    }

    #[test]
    fn extrude_dispatches_on_kind() {
        let context = EditContext::default();
        let mut cube = shapes::cube(1.0);
        let faces = context.extrude(&mut cube, &Selection::Faces(vec![4])).unwrap();
        assert_eq!(faces.applied(), Some(Selection::Faces(vec![4])));

        let outcome = context.extrude(&mut cube, &Selection::Vertices(vec![0])).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::NothingToDo));
    }

    #[test]
    fn manifold_setting_reaches_edge_extrusion() {
        let mut context = EditContext::default();
        let mut cube = shapes::cube(1.0);
        let edge = Selection::Edges(vec![Edge::new(0, 1)]);
        let outcome = context.extrude(&mut cube, &edge).unwrap();
        assert_eq!(outcome.declined(), Some(&Declined::EdgeNotFree));

        context.settings_mut().manifold_edge_extrusion = false;
        assert!(context.extrude(&mut cube, &edge).unwrap().is_applied());
    }

    #[test]
    fn deleting_a_corner_removes_its_faces() {
        let mut cube = shapes::cube(1.0);
        let _ = EditContext::default()
            .delete(&mut cube, &Selection::Vertices(vec![0, 13, 23]))
            .unwrap();
        assert_eq!(cube.face_count(), 3);
    }

    #[test]
    fn grow_faces_on_grid() {
        let grid = shapes::plane(3.0, 3.0, 3, 3);
        let grown = EditContext::default().grow(&grid, &Selection::Faces(vec![4])).unwrap();
        assert_eq!(grown, Selection::Faces((0..9).collect()));
    }

    #[test]
    fn pivot_follows_selected_face() {
        let mut cube = shapes::cube(1.0);
        let outcome = EditContext::default()
            .set_pivot(&mut cube, &Selection::Faces(vec![2]))
            .unwrap();
        assert!(outcome.is_applied());
        let pivot = cube.transform.transform_point(&Point3::origin());
        assert_relative_eq!(pivot, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn compile_honors_ceiling() {
        let mut context = EditContext::default();
        context.settings_mut().max_vertices = 8;
        let pieces = context.compile(&shapes::cube(1.0)).unwrap();
        assert_eq!(pieces.len(), 3);
    }
}
