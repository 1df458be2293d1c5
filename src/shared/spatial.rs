use std::collections::HashMap;

use crate::math::Point3;

/// Smallest cell edge; keeps the inverse finite for zero weld distances.
const MIN_CELL: f64 = 1e-9;

/// Uniform grid binning point indices for radius queries.
#[derive(Debug)]
pub(crate) struct SpatialHash {
    inv_cell_size: f64,
    grid: HashMap<(i64, i64, i64), Vec<usize>>,
}

impl SpatialHash {
    pub(crate) fn new(cell_size: f64) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size.max(MIN_CELL),
            grid: HashMap::new(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_key(&self, p: &Point3) -> (i64, i64, i64) {
        (
            (p.x * self.inv_cell_size).floor() as i64,
            (p.y * self.inv_cell_size).floor() as i64,
            (p.z * self.inv_cell_size).floor() as i64,
        )
    }

    pub(crate) fn insert(&mut self, index: usize, p: &Point3) {
        let key = self.cell_key(p);
        self.grid.entry(key).or_default().push(index);
    }

    /// Indices binned in the cell of `p` and its 26 neighbors, ascending.
    pub(crate) fn candidates(&self, p: &Point3) -> Vec<usize> {
        let (cx, cy, cz) = self.cell_key(p);
        let mut out = Vec::new();
        for dx in -1..=1_i64 {
            for dy in -1..=1_i64 {
                for dz in -1..=1_i64 {
                    let key = (cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz));
                    if let Some(bucket) = self.grid.get(&key) {
                        out.extend_from_slice(bucket);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_across_cell_boundary_are_candidates() {
        let mut hash = SpatialHash::new(0.1);
        hash.insert(0, &Point3::new(0.099, 0.0, 0.0));
        hash.insert(1, &Point3::new(0.101, 0.0, 0.0));
        hash.insert(2, &Point3::new(5.0, 0.0, 0.0));
        assert_eq!(hash.candidates(&Point3::new(0.1, 0.0, 0.0)), vec![0, 1]);
    }
}
