//! Equivalence classes over vertex indices.
//!
//! A [`SharedGroups`] value is a partition of `[0, vertex_count)`: every
//! vertex belongs to exactly one group. Meshes keep two independent
//! partitions, one for positions (welding) and one for UV values.

mod spatial;
mod union_find;

use std::collections::HashMap;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::math::Point3;

pub(crate) use spatial::SpatialHash;
pub(crate) use union_find::UnionFind;

/// A partition of vertex indices into groups.
///
/// Groups are kept normalized: ordered by their smallest member, members
/// ascending. Two partitions over the same indices therefore compare equal
/// exactly when they group the indices the same way.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedGroups {
    lookup: Vec<usize>,
    groups: Vec<Vec<usize>>,
}

impl SharedGroups {
    /// Every vertex in its own group.
    #[must_use]
    pub fn singletons(vertex_count: usize) -> Self {
        Self {
            lookup: (0..vertex_count).collect(),
            groups: (0..vertex_count).map(|i| vec![i]).collect(),
        }
    }

    /// Builds a partition from explicit groups.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::BrokenPartition`] if an index is out of range,
    /// repeated, or missing, or if a group is empty.
    pub fn from_groups(groups: &[Vec<usize>], vertex_count: usize) -> Result<Self> {
        let mut labels = vec![usize::MAX; vertex_count];
        for (g, members) in groups.iter().enumerate() {
            if members.is_empty() {
                return Err(MeshError::BrokenPartition(format!("group {g} is empty")).into());
            }
            for &v in members {
                let slot = labels.get_mut(v).ok_or_else(|| {
                    MeshError::BrokenPartition(format!("index {v} exceeds vertex count {vertex_count}"))
                })?;
                if *slot != usize::MAX {
                    return Err(
                        MeshError::BrokenPartition(format!("index {v} is in more than one group")).into(),
                    );
                }
                *slot = g;
            }
        }
        if let Some(v) = labels.iter().position(|&l| l == usize::MAX) {
            return Err(MeshError::BrokenPartition(format!("index {v} is in no group")).into());
        }
        Ok(Self::from_labels(&labels))
    }

    /// Builds a partition from arbitrary per-vertex labels; vertices with
    /// equal labels share a group.
    #[must_use]
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut remap: HashMap<usize, usize> = HashMap::new();
        let mut lookup = Vec::with_capacity(labels.len());
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (v, label) in labels.iter().enumerate() {
            let g = *remap.entry(*label).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(v);
            lookup.push(g);
        }
        Self { lookup, groups }
    }

    /// Groups every pair of points closer than `epsilon`, transitively.
    ///
    /// Candidate pairs come from a uniform spatial hash with cell size
    /// `epsilon`, so the cost is linear in the number of points for
    /// well-spread input.
    #[must_use]
    pub fn build_from_positions(positions: &[Point3], epsilon: f64) -> Self {
        let labels = cluster_points(positions, epsilon, false);
        let groups = Self::from_labels(&labels);
        debug!(
            vertices = positions.len(),
            groups = groups.len(),
            "built shared groups from positions"
        );
        groups
    }

    /// Group id of every vertex.
    #[must_use]
    pub fn lookup(&self) -> &[usize] {
        &self.lookup
    }

    /// Group id of vertex `v`.
    #[must_use]
    pub fn group_of(&self, v: usize) -> Option<usize> {
        self.lookup.get(v).copied()
    }

    /// Members of group `g`.
    #[must_use]
    pub fn group(&self, g: usize) -> Option<&[usize]> {
        self.groups.get(g).map(Vec::as_slice)
    }

    /// Every vertex sharing a group with `v`, including `v`.
    #[must_use]
    pub fn coincident(&self, v: usize) -> &[usize] {
        self.group_of(v)
            .and_then(|g| self.group(g))
            .unwrap_or(&[])
    }

    /// Iterates groups in normalized order.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.groups.iter().map(Vec::as_slice)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of vertices covered by the partition.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.lookup.len()
    }

    /// Distinct group ids touched by `indices`, ascending.
    #[must_use]
    pub fn groups_of(&self, indices: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = indices.iter().filter_map(|&v| self.group_of(v)).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Merges the groups of every index in `indices` into one.
    pub fn merge(&mut self, indices: &[usize]) {
        let touched = self.groups_of(indices);
        let Some(&target) = touched.first() else {
            return;
        };
        let mut labels = self.lookup.clone();
        for label in &mut labels {
            if touched.binary_search(label).is_ok() {
                *label = target;
            }
        }
        *self = Self::from_labels(&labels);
    }

    /// Moves `v` out of its group into a new singleton group.
    pub fn detach(&mut self, v: usize) {
        if v >= self.lookup.len() || self.coincident(v).len() < 2 {
            return;
        }
        let mut labels = self.lookup.clone();
        labels[v] = usize::MAX;
        *self = Self::from_labels(&labels);
    }

    /// Registers a new vertex (index `vertex_count()`) as a singleton.
    pub fn push_singleton(&mut self) -> usize {
        let v = self.lookup.len();
        self.lookup.push(self.groups.len());
        self.groups.push(vec![v]);
        v
    }

    /// Registers a new vertex in the same group as `existing`.
    ///
    /// Falls back to a singleton when `existing` is out of range.
    pub fn push_into(&mut self, existing: usize) -> usize {
        let Some(g) = self.group_of(existing) else {
            return self.push_singleton();
        };
        let v = self.lookup.len();
        self.lookup.push(g);
        self.groups[g].push(v);
        v
    }

    /// Applies a compaction remap: `remap[old]` is the new index or `None`
    /// for a dropped vertex. Groups left empty disappear.
    pub fn remove(&mut self, remap: &[Option<usize>], new_len: usize) {
        let mut labels = vec![usize::MAX; new_len];
        for (old, new) in remap.iter().enumerate() {
            if let (Some(new), Some(&g)) = (new, self.lookup.get(old)) {
                if let Some(slot) = labels.get_mut(*new) {
                    *slot = g;
                }
            }
        }
        // Indices with no source keep their own identity.
        let base = self.groups.len();
        for (i, label) in labels.iter_mut().enumerate() {
            if *label == usize::MAX {
                *label = base + i;
            }
        }
        *self = Self::from_labels(&labels);
    }

    /// Appends another partition, shifting its indices past this one.
    pub fn append(&mut self, other: &SharedGroups) {
        let base = self.groups.len();
        let mut labels = self.lookup.clone();
        labels.extend(other.lookup.iter().map(|g| g + base));
        *self = Self::from_labels(&labels);
    }

    /// The partition restricted to `indices`, re-indexed so that
    /// `indices[i]` becomes `i`.
    #[must_use]
    pub fn restricted(&self, indices: &[usize]) -> Self {
        let base = self.groups.len();
        let labels: Vec<usize> = indices
            .iter()
            .enumerate()
            .map(|(i, &v)| self.group_of(v).unwrap_or(base + i))
            .collect();
        Self::from_labels(&labels)
    }

    /// Verifies that this is a partition of `[0, vertex_count)`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::BrokenPartition`] describing the first violation.
    pub fn check_partition(&self, vertex_count: usize) -> Result<()> {
        if self.lookup.len() != vertex_count {
            return Err(MeshError::BrokenPartition(format!(
                "lookup covers {} vertices, mesh has {vertex_count}",
                self.lookup.len()
            ))
            .into());
        }
        let mut seen = vec![false; vertex_count];
        for (g, members) in self.groups.iter().enumerate() {
            if members.is_empty() {
                return Err(MeshError::BrokenPartition(format!("group {g} is empty")).into());
            }
            for &v in members {
                match seen.get_mut(v) {
                    Some(s) if !*s && self.lookup[v] == g => *s = true,
                    Some(_) => {
                        return Err(MeshError::BrokenPartition(format!(
                            "index {v} is listed twice or disagrees with its lookup"
                        ))
                        .into())
                    }
                    None => {
                        return Err(MeshError::BrokenPartition(format!(
                            "index {v} exceeds vertex count {vertex_count}"
                        ))
                        .into())
                    }
                }
            }
        }
        if let Some(v) = seen.iter().position(|s| !s) {
            return Err(MeshError::BrokenPartition(format!("index {v} is in no group")).into());
        }
        Ok(())
    }
}

/// Clusters points by distance, transitively, returning the smallest member
/// index of each point's cluster.
///
/// With `inclusive` a pair at exactly `distance` joins; otherwise the test is
/// strict.
pub(crate) fn cluster_points(points: &[Point3], distance: f64, inclusive: bool) -> Vec<usize> {
    let mut uf = UnionFind::new(points.len());
    let mut hash = SpatialHash::new(distance);
    for (i, p) in points.iter().enumerate() {
        hash.insert(i, p);
    }
    for (i, p) in points.iter().enumerate() {
        for j in hash.candidates(p) {
            if j <= i {
                continue;
            }
            let d = (points[j] - p).norm();
            if d < distance || (inclusive && d <= distance) {
                uf.union(i, j);
            }
        }
    }
    uf.roots()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mesh::shapes;

    // ── construction ──

    #[test]
    fn singletons_form_a_partition() {
        let groups = SharedGroups::singletons(4);
        groups.check_partition(4).unwrap();
        assert_eq!(groups.len(), 4);
    }

    #[test]
    fn from_groups_rejects_overlap_and_gaps() {
        assert!(SharedGroups::from_groups(&[vec![0, 1], vec![1, 2]], 3).is_err());
        assert!(SharedGroups::from_groups(&[vec![0, 1]], 3).is_err());
        assert!(SharedGroups::from_groups(&[vec![0, 5]], 2).is_err());
    }

    #[test]
    fn from_groups_normalizes_order() {
        let groups = SharedGroups::from_groups(&[vec![3, 1], vec![2, 0]], 4).unwrap();
        assert_eq!(groups.group(0), Some(&[0, 2][..]));
        assert_eq!(groups.group(1), Some(&[1, 3][..]));
        assert_eq!(groups.lookup(), &[0, 1, 0, 1]);
    }

    #[test]
    fn build_uses_strict_distance() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        let groups = SharedGroups::build_from_positions(&pts, 0.5);
        assert_eq!(groups.len(), 4);
        let groups = SharedGroups::build_from_positions(&pts, 0.51);
        assert_eq!(groups.group(0), Some(&[0, 1, 2][..]));
        assert_eq!(groups.group(1), Some(&[3][..]));
    }

    #[test]
    fn cube_corners_weld_into_eight_groups_of_three() {
        let cube = shapes::cube(1.0);
        let positions: Vec<Point3> = cube.vertices().iter().map(|v| v.position).collect();
        assert_eq!(positions.len(), 24);
        let groups = SharedGroups::build_from_positions(&positions, 1e-5);
        groups.check_partition(24).unwrap();
        assert_eq!(groups.len(), 8);
        assert!(groups.iter().all(|g| g.len() == 3));
    }

    // ── mutation ──

    #[test]
    fn merge_is_transitive() {
        let mut groups = SharedGroups::singletons(5);
        groups.merge(&[0, 1]);
        groups.merge(&[1, 4]);
        assert_eq!(groups.coincident(4), &[0, 1, 4]);
        groups.check_partition(5).unwrap();
    }

    #[test]
    fn detach_leaves_a_partition() {
        let mut groups = SharedGroups::from_groups(&[vec![0, 1, 2]], 3).unwrap();
        groups.detach(1);
        groups.check_partition(3).unwrap();
        assert_eq!(groups.coincident(0), &[0, 2]);
        assert_eq!(groups.coincident(1), &[1]);
    }

    #[test]
    fn push_keeps_normalized_order() {
        let mut groups = SharedGroups::from_groups(&[vec![0, 1], vec![2]], 3).unwrap();
        assert_eq!(groups.push_into(0), 3);
        assert_eq!(groups.push_singleton(), 4);
        groups.check_partition(5).unwrap();
        assert_eq!(groups, SharedGroups::from_groups(&[vec![0, 1, 3], vec![2], vec![4]], 5).unwrap());
    }

    #[test]
    fn remove_compacts_indices() {
        let mut groups = SharedGroups::from_groups(&[vec![0, 2], vec![1, 3]], 4).unwrap();
        groups.remove(&[Some(0), None, Some(1), Some(2)], 3);
        groups.check_partition(3).unwrap();
        assert_eq!(groups.coincident(0), &[0, 1]);
        assert_eq!(groups.coincident(2), &[2]);
    }

    #[test]
    fn append_shifts_other_partition() {
        let mut a = SharedGroups::from_groups(&[vec![0, 1]], 2).unwrap();
        let b = SharedGroups::from_groups(&[vec![0, 1]], 2).unwrap();
        a.append(&b);
        a.check_partition(4).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a.coincident(3), &[2, 3]);
    }

    #[test]
    fn restricted_reindexes_subset() {
        let groups = SharedGroups::from_groups(&[vec![0, 3], vec![1, 2]], 4).unwrap();
        let sub = groups.restricted(&[3, 2, 0]);
        sub.check_partition(3).unwrap();
        assert_eq!(sub.coincident(0), &[0, 2]);
        assert_eq!(sub.coincident(1), &[1]);
    }
}
