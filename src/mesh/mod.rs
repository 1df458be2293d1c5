pub mod edge;
pub mod face;
pub mod shapes;
pub mod unwrap;
pub mod vertex;

pub use edge::Edge;
pub use face::{Face, MaterialId};
pub use unwrap::{Anchor, AutoUnwrapSettings, Fill};
pub use vertex::Vertex;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::math::{
    newell_normal, triangle_normal, triangulate_polygon, try_normalize, Matrix4, Point3, Vector3,
    TOLERANCE,
};
use crate::shared::SharedGroups;

/// The editable mesh: flat vertex and face arenas plus the two shared-group
/// partitions over vertex indices.
///
/// Faces and groups refer to vertices by index only. Every operation that
/// appends, removes or remaps vertices keeps both partitions in step.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    shared_vertices: SharedGroups,
    shared_textures: SharedGroups,
    /// Local to world transform, used by world-space UV projection.
    pub transform: Matrix4,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Mesh {
    /// Creates an unwelded mesh: every vertex is its own shared group.
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        let n = vertices.len();
        Self {
            vertices,
            faces,
            shared_vertices: SharedGroups::singletons(n),
            shared_textures: SharedGroups::singletons(n),
            transform: Matrix4::identity(),
        }
    }

    /// Creates a mesh with explicit position and UV groups.
    ///
    /// # Errors
    ///
    /// Returns a [`MeshError`] if either partition does not cover the vertex
    /// range or a face is malformed.
    pub fn with_groups(
        vertices: Vec<Vertex>,
        faces: Vec<Face>,
        shared_vertices: SharedGroups,
        shared_textures: SharedGroups,
    ) -> Result<Self> {
        let mesh = Self {
            vertices,
            faces,
            shared_vertices,
            shared_textures,
            transform: Matrix4::identity(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    // --- Accessors ---

    /// All vertices.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Mutable vertex attributes. The vertex count cannot change through
    /// this view, so the partitions stay valid.
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// All faces.
    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Position welding partition.
    #[must_use]
    pub fn shared_vertices(&self) -> &SharedGroups {
        &self.shared_vertices
    }

    /// UV welding partition.
    #[must_use]
    pub fn shared_textures(&self) -> &SharedGroups {
        &self.shared_textures
    }

    /// Returns the vertex at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale index.
    pub fn vertex(&self, index: usize) -> Result<&Vertex> {
        self.vertices.get(index).ok_or_else(|| {
            MeshError::IndexOutOfRange {
                kind: "vertex",
                index,
                len: self.vertices.len(),
            }
            .into()
        })
    }

    /// Returns the face at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale index.
    pub fn face(&self, index: usize) -> Result<&Face> {
        self.faces.get(index).ok_or_else(|| {
            MeshError::IndexOutOfRange {
                kind: "face",
                index,
                len: self.faces.len(),
            }
            .into()
        })
    }

    /// Returns the face at `index` for metadata edits.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale index.
    pub fn face_mut(&mut self, index: usize) -> Result<&mut Face> {
        let len = self.faces.len();
        self.faces.get_mut(index).ok_or_else(|| {
            MeshError::IndexOutOfRange {
                kind: "face",
                index,
                len,
            }
            .into()
        })
    }

    /// Position of every vertex, in local space.
    #[must_use]
    pub fn positions(&self) -> Vec<Point3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Position of every vertex, transformed to world space.
    #[must_use]
    pub fn world_positions(&self) -> Vec<Point3> {
        self.vertices
            .iter()
            .map(|v| self.transform.transform_point(&v.position))
            .collect()
    }

    /// Overwrites all positions at once.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::AttributeMismatch`] if the array length differs
    /// from the vertex count.
    pub fn set_positions(&mut self, positions: &[Point3]) -> Result<()> {
        if positions.len() != self.vertices.len() {
            return Err(MeshError::AttributeMismatch(format!(
                "{} positions for {} vertices",
                positions.len(),
                self.vertices.len()
            ))
            .into());
        }
        for (v, p) in self.vertices.iter_mut().zip(positions) {
            v.position = *p;
        }
        Ok(())
    }

    // --- Shared groups ---

    /// Replaces the position partition.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::BrokenPartition`] if it does not cover the vertex
    /// range.
    pub fn set_shared_vertices(&mut self, groups: SharedGroups) -> Result<()> {
        groups.check_partition(self.vertices.len())?;
        self.shared_vertices = groups;
        Ok(())
    }

    /// Replaces the UV partition.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::BrokenPartition`] if it does not cover the vertex
    /// range.
    pub fn set_shared_textures(&mut self, groups: SharedGroups) -> Result<()> {
        groups.check_partition(self.vertices.len())?;
        self.shared_textures = groups;
        Ok(())
    }

    /// Rebuilds the position partition from vertex positions.
    pub fn rebuild_shared_vertices(&mut self, epsilon: f64) {
        self.shared_vertices = SharedGroups::build_from_positions(&self.positions(), epsilon);
    }

    pub(crate) fn shared_vertices_mut(&mut self) -> &mut SharedGroups {
        &mut self.shared_vertices
    }

    pub(crate) fn shared_textures_mut(&mut self) -> &mut SharedGroups {
        &mut self.shared_textures
    }

    /// Position group id of every vertex.
    #[must_use]
    pub fn common_lookup(&self) -> &[usize] {
        self.shared_vertices.lookup()
    }

    /// The edge expressed in position-group ids.
    #[must_use]
    pub fn common_edge(&self, edge: &Edge) -> Option<Edge> {
        edge.to_common(self.shared_vertices.lookup())
    }

    // --- Validation ---

    /// Checks every structural invariant: face index lists are non-empty
    /// triangle lists with in-range indices, and both partitions cover the
    /// vertex range.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeshError`] found.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (f, face) in self.faces.iter().enumerate() {
            let indices = face.indices();
            if indices.is_empty() || indices.len() % 3 != 0 {
                return Err(MeshError::MalformedFace {
                    face: f,
                    reason: format!("{} indices is not a triangle list", indices.len()),
                }
                .into());
            }
            if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
                return Err(MeshError::MalformedFace {
                    face: f,
                    reason: format!("vertex index {bad} out of range (len {n})"),
                }
                .into());
            }
        }
        self.shared_vertices.check_partition(n)?;
        self.shared_textures.check_partition(n)?;
        Ok(())
    }

    /// Returns an error for any index in `faces` that is out of range.
    pub(crate) fn check_faces(&self, faces: &[usize]) -> Result<()> {
        for &f in faces {
            self.face(f)?;
        }
        Ok(())
    }

    /// Returns an error for any index in `vertices` that is out of range.
    pub(crate) fn check_vertices(&self, vertices: &[usize]) -> Result<()> {
        for &v in vertices {
            self.vertex(v)?;
        }
        Ok(())
    }

    // --- Geometry ---

    /// Unit normal of face `index`.
    ///
    /// Computed with Newell's method over the perimeter, falling back to the
    /// summed triangle normals; zero for a degenerate face.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale face or vertex.
    pub fn face_normal(&self, index: usize) -> Result<Vector3> {
        let face = self.face(index)?;
        if let Some(ring) = face.perimeter() {
            let points = ring
                .iter()
                .map(|&v| self.vertex(v).map(|v| v.position))
                .collect::<Result<Vec<_>>>()?;
            if let Some(n) = newell_normal(&points) {
                return Ok(n);
            }
        }
        let mut sum = Vector3::zeros();
        for [a, b, c] in face.triangles() {
            sum += triangle_normal(
                &self.vertex(a)?.position,
                &self.vertex(b)?.position,
                &self.vertex(c)?.position,
            );
        }
        Ok(try_normalize(&sum).unwrap_or_else(Vector3::zeros))
    }

    /// Perimeter loop of face `index`; the distinct indices when the
    /// perimeter is not one simple loop.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale face.
    pub fn face_perimeter(&self, index: usize) -> Result<Vec<usize>> {
        let face = self.face(index)?;
        Ok(face
            .perimeter()
            .unwrap_or_else(|| face.distinct_indices().to_vec()))
    }

    /// Builds a face over the vertex loop `ring`, triangulated in its own
    /// plane and carrying the metadata of `template`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] if `ring` holds a stale index.
    pub fn polygon_face(&self, ring: &[usize], template: &Face) -> Result<Face> {
        let points = ring
            .iter()
            .map(|&v| self.vertex(v).map(|v| v.position))
            .collect::<Result<Vec<_>>>()?;
        let indices = triangulate_polygon(&points)
            .into_iter()
            .flat_map(|[a, b, c]| [ring[a], ring[b], ring[c]])
            .collect();
        Ok(Face::new(indices).with_metadata_of(template))
    }

    /// A positive texture group id not used by any face.
    #[must_use]
    pub fn unused_texture_group(&self) -> i32 {
        self.faces
            .iter()
            .map(|f| f.texture_group)
            .max()
            .unwrap_or(0)
            .max(0)
            + 1
    }

    /// A non-negative element group id not used by any face.
    #[must_use]
    pub fn unused_element_group(&self) -> i32 {
        self.faces
            .iter()
            .map(|f| f.element_group)
            .max()
            .unwrap_or(-1)
            .max(-1)
            + 1
    }

    // --- Arena mutation ---

    pub(crate) fn faces_mut(&mut self) -> &mut Vec<Face> {
        &mut self.faces
    }

    /// Appends a vertex as a new singleton in both partitions.
    pub(crate) fn push_vertex(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        self.shared_textures.push_singleton();
        self.shared_vertices.push_singleton()
    }

    /// Appends a vertex welded to `existing`; its UV identity is new.
    pub(crate) fn push_coincident(&mut self, vertex: Vertex, existing: usize) -> usize {
        self.vertices.push(vertex);
        self.shared_textures.push_singleton();
        self.shared_vertices.push_into(existing)
    }

    /// Removes the given faces and drops vertices left unreferenced.
    ///
    /// Returns the vertex remap applied by the compaction.
    pub(crate) fn remove_faces(&mut self, faces: &[usize]) -> Vec<Option<usize>> {
        let mut doomed = vec![false; self.faces.len()];
        for &f in faces {
            if let Some(d) = doomed.get_mut(f) {
                *d = true;
            }
        }
        let mut i = 0;
        self.faces.retain(|_| {
            let keep = !doomed[i];
            i += 1;
            keep
        });
        self.remove_unused_vertices()
    }

    /// Drops vertices no face references and compacts indices in faces and
    /// both partitions.
    ///
    /// Returns `remap[old] = Some(new)` for surviving vertices.
    pub(crate) fn remove_unused_vertices(&mut self) -> Vec<Option<usize>> {
        let mut used = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &i in face.distinct_indices() {
                if let Some(u) = used.get_mut(i) {
                    *u = true;
                }
            }
        }
        let mut remap = vec![None; self.vertices.len()];
        let mut next = 0;
        for (old, &keep) in used.iter().enumerate() {
            if keep {
                remap[old] = Some(next);
                next += 1;
            }
        }
        if next == self.vertices.len() {
            return remap;
        }
        let dropped = self.vertices.len() - next;
        let mut old = 0;
        self.vertices.retain(|_| {
            let keep = used[old];
            old += 1;
            keep
        });
        for face in &mut self.faces {
            face.remap(|i| remap[i].unwrap_or(i));
        }
        self.shared_vertices.remove(&remap, next);
        self.shared_textures.remove(&remap, next);
        debug!(dropped, "removed unused vertices");
        remap
    }

    /// Removes triangles touching fewer than three position groups or with
    /// zero area, then faces left without triangles.
    ///
    /// Returns the face remap: `remap[old] = Some(new)` for surviving faces.
    pub(crate) fn prune_degenerate(&mut self) -> Vec<Option<usize>> {
        let lookup = self.shared_vertices.lookup().to_vec();
        let vertices = &self.vertices;
        let degenerate = |[a, b, c]: [usize; 3]| -> bool {
            let (Some(&ga), Some(&gb), Some(&gc)) = (lookup.get(a), lookup.get(b), lookup.get(c))
            else {
                return true;
            };
            if ga == gb || gb == gc || ga == gc {
                return true;
            }
            match (vertices.get(a), vertices.get(b), vertices.get(c)) {
                (Some(va), Some(vb), Some(vc)) => {
                    triangle_normal(&va.position, &vb.position, &vc.position).norm() < TOLERANCE
                }
                _ => true,
            }
        };
        let mut pruned = 0;
        for face in &mut self.faces {
            let kept: Vec<usize> = face
                .triangles()
                .filter(|&t| !degenerate(t))
                .flatten()
                .collect();
            if kept.len() != face.indices().len() {
                pruned += (face.indices().len() - kept.len()) / 3;
                face.set_indices(kept);
            }
        }
        let mut remap = Vec::with_capacity(self.faces.len());
        let mut next = 0;
        for face in &self.faces {
            if face.indices().is_empty() {
                remap.push(None);
            } else {
                remap.push(Some(next));
                next += 1;
            }
        }
        self.faces.retain(|f| !f.indices().is_empty());
        if pruned > 0 {
            debug!(pruned, faces_removed = remap.len() - next, "pruned degenerate triangles");
        }
        remap
    }

    /// A new mesh containing only the given faces, with their vertices and
    /// both partitions restricted and re-indexed.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::IndexOutOfRange`] for a stale face index.
    pub fn extract(&self, faces: &[usize]) -> Result<Mesh> {
        self.check_faces(faces)?;
        let mut order: Vec<usize> = faces.to_vec();
        order.sort_unstable();
        order.dedup();
        let mut remap = vec![None; self.vertices.len()];
        let mut kept = Vec::new();
        for &f in &order {
            for &v in self.faces[f].distinct_indices() {
                if remap[v].is_none() {
                    remap[v] = Some(kept.len());
                    kept.push(v);
                }
            }
        }
        let vertices = kept.iter().map(|&v| self.vertices[v]).collect();
        let new_faces = order
            .iter()
            .map(|&f| {
                let mut face = self.faces[f].clone();
                face.remap(|i| remap[i].unwrap_or(i));
                face
            })
            .collect();
        Ok(Mesh {
            vertices,
            faces: new_faces,
            shared_vertices: self.shared_vertices.restricted(&kept),
            shared_textures: self.shared_textures.restricted(&kept),
            transform: self.transform,
        })
    }

    /// Appends `other`'s vertices, faces and partitions, shifting indices.
    ///
    /// Returns the index offset applied to `other`'s vertices.
    pub(crate) fn append(&mut self, other: &Mesh) -> usize {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(other.faces.iter().map(|f| {
            let mut face = f.clone();
            face.remap(|i| i + offset);
            face
        }));
        self.shared_vertices.append(&other.shared_vertices);
        self.shared_textures.append(&other.shared_textures);
        offset
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn quad_strip() -> Mesh {
        // Two quads sharing the edge 1-2, unwelded.
        let verts = [
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (1.0, 1.0),
        ]
        .iter()
        .map(|&(x, y)| Vertex::new(Point3::new(x, y, 0.0)))
        .collect();
        let mut mesh = Mesh::new(verts, vec![Face::quad(0, 1, 2, 3), Face::quad(4, 5, 6, 7)]);
        mesh.rebuild_shared_vertices(1e-5);
        mesh
    }

    // ── construction ──

    #[test]
    fn new_mesh_is_valid_and_unwelded() {
        let mesh = Mesh::new(vec![Vertex::default(); 3], vec![Face::triangle(0, 1, 2)]);
        mesh.validate().unwrap();
        assert_eq!(mesh.shared_vertices().len(), 3);
    }

    #[test]
    fn with_groups_rejects_bad_partition() {
        let result = Mesh::with_groups(
            vec![Vertex::default(); 3],
            vec![Face::triangle(0, 1, 2)],
            SharedGroups::singletons(2),
            SharedGroups::singletons(3),
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_flags_out_of_range_face() {
        let mesh = Mesh::new(vec![Vertex::default(); 3], vec![Face::triangle(0, 1, 7)]);
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn stale_indices_are_errors() {
        let mesh = quad_strip();
        assert!(mesh.face(9).is_err());
        assert!(mesh.vertex(99).is_err());
    }

    // ── geometry ──

    #[test]
    fn face_normal_of_ccw_quad_points_up() {
        let mesh = quad_strip();
        assert_relative_eq!(mesh.face_normal(0).unwrap(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn polygon_face_triangulates_ring() {
        let mesh = quad_strip();
        let face = mesh.polygon_face(&[0, 1, 2, 3], &mesh.faces()[0]).unwrap();
        assert_eq!(face.triangle_count(), 2);
        assert_eq!(face.perimeter().map(|r| r.len()), Some(4));
    }

    // ── arena mutation ──

    #[test]
    fn remove_faces_compacts_everything() {
        let mut mesh = quad_strip();
        let remap = mesh.remove_faces(&[0]);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(remap[4], Some(0));
        assert_eq!(remap[0], None);
        mesh.validate().unwrap();
    }

    #[test]
    fn prune_removes_collapsed_triangles() {
        let mut mesh = quad_strip();
        mesh.shared_vertices_mut().merge(&[0, 1]);
        let remap = mesh.prune_degenerate();
        assert_eq!(remap, vec![Some(0), Some(1)]);
        assert_eq!(mesh.faces()[0].triangle_count(), 1);
    }

    #[test]
    fn extract_restricts_partitions() {
        let mesh = quad_strip();
        let part = mesh.extract(&[1]).unwrap();
        part.validate().unwrap();
        assert_eq!(part.vertex_count(), 4);
        assert_eq!(part.face_count(), 1);
    }

    #[test]
    fn append_shifts_indices() {
        let mut mesh = quad_strip();
        let other = quad_strip();
        let offset = mesh.append(&other);
        assert_eq!(offset, 8);
        assert_eq!(mesh.faces()[2].indices()[0], 8);
        mesh.validate().unwrap();
        assert_eq!(mesh.shared_vertices().len(), 12);
    }

    #[test]
    fn unused_group_ids() {
        let mut mesh = quad_strip();
        assert_eq!(mesh.unused_texture_group(), 1);
        assert_eq!(mesh.unused_element_group(), 0);
        mesh.face_mut(1).unwrap().texture_group = 4;
        assert_eq!(mesh.unused_texture_group(), 5);
    }
}
