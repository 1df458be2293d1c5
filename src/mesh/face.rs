use std::collections::HashMap;

use super::edge::Edge;
use super::unwrap::AutoUnwrapSettings;

slotmap::new_key_type! {
    /// Opaque handle to a material owned by the caller's asset registry.
    ///
    /// The kernel stores and groups by it but never dereferences it. The
    /// default (null) key stands for the default material.
    pub struct MaterialId;
}

/// A polygon stored as a triangle list, plus the metadata the editor keeps
/// per face.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    indices: Vec<usize>,
    distinct: Vec<usize>,
    /// Smoothing group; 0 renders hard edges.
    pub smoothing_group: u32,
    /// Faces with the same positive group share one auto projection.
    pub texture_group: i32,
    /// UV shell id; negative means no shell.
    pub element_group: i32,
    /// User-authored UVs that geometry edits leave alone.
    pub manual_uv: bool,
    /// Auto projection settings.
    pub uv: AutoUnwrapSettings,
    /// Material handle.
    pub material: MaterialId,
}

impl Face {
    /// Creates a face from a triangle list with default metadata.
    ///
    /// The caller is responsible for `indices.len()` being a multiple of 3;
    /// [`crate::mesh::Mesh::validate`] reports violations.
    #[must_use]
    pub fn new(indices: Vec<usize>) -> Self {
        let distinct = distinct_of(&indices);
        Self {
            indices,
            distinct,
            smoothing_group: 0,
            texture_group: -1,
            element_group: -1,
            manual_uv: false,
            uv: AutoUnwrapSettings::default(),
            material: MaterialId::default(),
        }
    }

    /// A single-triangle face.
    #[must_use]
    pub fn triangle(a: usize, b: usize, c: usize) -> Self {
        Self::new(vec![a, b, c])
    }

    /// A quad face from a counter-clockwise loop `a b c d`.
    #[must_use]
    pub fn quad(a: usize, b: usize, c: usize, d: usize) -> Self {
        Self::new(vec![a, b, c, a, c, d])
    }

    /// Copies every metadata field (groups, UV state, material) from `other`.
    #[must_use]
    pub fn with_metadata_of(mut self, other: &Face) -> Self {
        self.smoothing_group = other.smoothing_group;
        self.texture_group = other.texture_group;
        self.element_group = other.element_group;
        self.manual_uv = other.manual_uv;
        self.uv = other.uv;
        self.material = other.material;
        self
    }

    /// The triangle list.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Replaces the triangle list and re-derives the distinct index set.
    pub fn set_indices(&mut self, indices: Vec<usize>) {
        self.distinct = distinct_of(&indices);
        self.indices = indices;
    }

    /// Unique vertex indices in first-use order.
    #[must_use]
    pub fn distinct_indices(&self) -> &[usize] {
        &self.distinct
    }

    /// Iterates the triangles of this face.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns `true` if the face references `index`.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.distinct.contains(&index)
    }

    /// Rewrites every index through `f`.
    pub fn remap(&mut self, f: impl Fn(usize) -> usize) {
        let indices = self.indices.iter().map(|&i| f(i)).collect();
        self.set_indices(indices);
    }

    /// Reverses the winding of every triangle.
    pub fn reverse(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    /// Perimeter edges: triangle edges that appear exactly once in this face,
    /// oriented along the face winding, in triangle order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        let mut counts: HashMap<Edge, usize> = HashMap::new();
        for [a, b, c] in self.triangles() {
            for e in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
                *counts.entry(e).or_insert(0) += 1;
            }
        }
        let mut perimeter = Vec::new();
        for [a, b, c] in self.triangles() {
            for e in [Edge::new(a, b), Edge::new(b, c), Edge::new(c, a)] {
                if counts.get(&e) == Some(&1) {
                    perimeter.push(e);
                }
            }
        }
        perimeter
    }

    /// The perimeter as one ordered vertex loop following the face winding.
    ///
    /// Returns `None` when the perimeter is not a single simple loop (faces
    /// with holes, bow-ties, or broken triangle lists).
    #[must_use]
    pub fn perimeter(&self) -> Option<Vec<usize>> {
        let edges = self.edges();
        if edges.len() < 3 {
            return None;
        }
        let mut next: HashMap<usize, usize> = HashMap::with_capacity(edges.len());
        for e in &edges {
            if next.insert(e.a, e.b).is_some() {
                return None;
            }
        }
        let start = edges[0].a;
        let mut ring = Vec::with_capacity(edges.len());
        let mut cur = start;
        loop {
            ring.push(cur);
            cur = *next.get(&cur)?;
            if cur == start {
                break;
            }
            if ring.len() > edges.len() {
                return None;
            }
        }
        (ring.len() == edges.len()).then_some(ring)
    }
}

fn distinct_of(indices: &[usize]) -> Vec<usize> {
    let mut distinct = Vec::with_capacity(indices.len());
    for &i in indices {
        if !distinct.contains(&i) {
            distinct.push(i);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_perimeter_skips_diagonal() {
        let face = Face::quad(0, 1, 2, 3);
        let edges = face.edges();
        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(&Edge::new(0, 2)));
    }

    #[test]
    fn quad_perimeter_loop_follows_winding() {
        let face = Face::quad(4, 5, 6, 7);
        assert_eq!(face.perimeter(), Some(vec![4, 5, 6, 7]));
    }

    #[test]
    fn distinct_indices_follow_updates() {
        let mut face = Face::triangle(0, 1, 2);
        face.set_indices(vec![3, 4, 5, 3, 5, 6]);
        assert_eq!(face.distinct_indices(), &[3, 4, 5, 6]);
        face.remap(|i| i - 3);
        assert_eq!(face.distinct_indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn reverse_flips_triangle_winding() {
        let mut face = Face::triangle(0, 1, 2);
        face.reverse();
        assert_eq!(face.indices(), &[0, 2, 1]);
        assert_eq!(face.perimeter(), Some(vec![0, 2, 1]));
    }

    #[test]
    fn metadata_is_inherited() {
        let mut parent = Face::triangle(0, 1, 2);
        parent.smoothing_group = 3;
        parent.texture_group = 7;
        parent.manual_uv = true;
        let child = Face::triangle(3, 4, 5).with_metadata_of(&parent);
        assert_eq!(child.smoothing_group, 3);
        assert_eq!(child.texture_group, 7);
        assert!(child.manual_uv);
    }
}
