//! The broad phase is responsible for detecting pairs of possibly
//! intersecting objects for further, more accurate narrow phase inspection.

use super::AABB;
use crate::math as m;

use std::collections::{HashMap, HashSet};

/// Integer coordinates of a cell in the hash.
pub type CellKey = (i32, i32, i32);

/// A uniform spatial hash grid, rebuilt from scratch every step.
///
/// Objects are identified by their index in whatever list the caller inserts them from.
/// Moving objects are inserted into each cell their bounding box touches,
/// and objects sharing a cell become candidate pairs.
///
/// Static objects are never stored in cells. They only need to meet moving objects,
/// so each one is checked against the cells that moving objects occupy.
/// This keeps a huge static ground from costing time proportional to its area.
#[derive(Clone, Debug)]
pub struct SpatialHash {
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    // id with the lowest and highest cell its bounds touch
    statics: Vec<(usize, CellKey, CellKey)>,
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SpatialHash {
    /// Create a spatial hash with the given cell size in world units.
    ///
    /// A good value is a little larger than the typical object in the scene.
    pub fn new(cell_size: f64) -> Self {
        SpatialHash {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            statics: Vec::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Remove everything from the hash.
    /// Cells that were occupied keep their allocations for the next step.
    pub fn clear(&mut self) {
        self.cells.retain(|_, cell| !cell.is_empty());
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.statics.clear();
    }

    /// Map a world-space point to the coordinates of the cell containing it.
    #[inline]
    pub fn cell_of(&self, p: m::Vec3) -> CellKey {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
            (p.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Insert an object into the hash.
    ///
    /// Static objects are only paired with non-static ones.
    /// Insertion order doesn't matter.
    pub fn insert(&mut self, id: usize, aabb: AABB, is_static: bool) {
        let lo = self.cell_of(aabb.min);
        let hi = self.cell_of(aabb.max);
        if is_static {
            self.statics.push((id, lo, hi));
            return;
        }

        for x in lo.0..=hi.0 {
            for y in lo.1..=hi.1 {
                for z in lo.2..=hi.2 {
                    self.cells.entry((x, y, z)).or_default().push(id);
                }
            }
        }
    }

    /// Number of cells currently holding at least one moving object.
    pub fn occupied_cell_count(&self) -> usize {
        self.cells.values().filter(|c| !c.is_empty()).count()
    }

    /// Return all pairs of objects sharing at least one cell,
    /// each pair once with the lower id first, sorted.
    pub fn pairs(&self) -> Vec<[usize; 2]> {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut pairs = Vec::new();
        let mut push_pair = |a: usize, b: usize| {
            if a == b {
                return;
            }
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                pairs.push([key.0, key.1]);
            }
        };

        for cell in self.cells.values() {
            for (i, &a) in cell.iter().enumerate() {
                for &b in &cell[i + 1..] {
                    push_pair(a, b);
                }
            }
        }

        for &(id, lo, hi) in &self.statics {
            // walk whichever is smaller, the static's span or the map itself
            if span_len(lo, hi) <= self.cells.len() as i64 {
                for x in lo.0..=hi.0 {
                    for y in lo.1..=hi.1 {
                        for z in lo.2..=hi.2 {
                            if let Some(cell) = self.cells.get(&(x, y, z)) {
                                cell.iter().for_each(|&b| push_pair(id, b));
                            }
                        }
                    }
                }
            } else {
                for (key, cell) in &self.cells {
                    if in_span(*key, lo, hi) {
                        cell.iter().for_each(|&b| push_pair(id, b));
                    }
                }
            }
        }

        // hash map iteration order is arbitrary, keep output deterministic
        pairs.sort_unstable();
        pairs
    }
}

/// Number of cells in the box between two cell coordinates, saturating on overflow.
fn span_len(lo: CellKey, hi: CellKey) -> i64 {
    let axis = |a: i32, b: i32| b as i64 - a as i64 + 1;
    axis(lo.0, hi.0)
        .saturating_mul(axis(lo.1, hi.1))
        .saturating_mul(axis(lo.2, hi.2))
}

#[inline]
fn in_span(key: CellKey, lo: CellKey, hi: CellKey) -> bool {
    (lo.0..=hi.0).contains(&key.0)
        && (lo.1..=hi.1).contains(&key.1)
        && (lo.2..=hi.2).contains(&key.2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn cube(center: m::Vec3, half: f64) -> AABB {
        AABB::from_center(center, m::Vec3::broadcast(half))
    }

    #[test]
    fn negative_coords_floor() {
        let hash = SpatialHash::new(1.0);
        assert_eq!(hash.cell_of(m::Vec3::new(-0.5, 0.5, -1.0)), (-1, 0, -1));
        let hash = SpatialHash::new(2.0);
        assert_eq!(hash.cell_of(m::Vec3::new(3.9, -0.1, 4.0)), (1, -1, 2));
    }

    #[test]
    fn shared_cells_give_one_pair() {
        let mut hash = SpatialHash::new(1.0);
        // both span the same 27 cells
        hash.insert(0, cube(m::Vec3::zero(), 1.2), false);
        hash.insert(1, cube(m::Vec3::new(0.1, 0.0, 0.0), 1.2), false);
        hash.insert(2, cube(m::Vec3::new(10.0, 0.0, 0.0), 0.4), false);
        assert_eq!(hash.pairs(), vec![[0, 1]]);
    }

    #[test]
    fn static_pairs_are_skipped() {
        let mut hash = SpatialHash::new(1.0);
        hash.insert(0, cube(m::Vec3::zero(), 0.4), true);
        hash.insert(1, cube(m::Vec3::zero(), 0.4), true);
        hash.insert(2, cube(m::Vec3::zero(), 0.4), false);
        assert_eq!(hash.pairs(), vec![[0, 2], [1, 2]]);
    }

    #[test]
    fn huge_static_ground_stays_cheap() {
        let mut hash = SpatialHash::new(1.0);
        // statics inserted first still find the moving objects added later
        let ground = AABB::from_center(
            m::Vec3::new(0.0, -1.0, 0.0),
            m::Vec3::new(500.0, 1.0, 500.0),
        );
        hash.insert(0, ground, true);
        hash.insert(1, cube(m::Vec3::new(3.5, 0.5, -2.5), 0.4), false);
        hash.insert(2, cube(m::Vec3::new(40.5, 5.5, 0.5), 0.4), false);
        hash.insert(3, cube(m::Vec3::new(0.5, -200.5, 0.5), 0.4), true);
        // only the moving objects occupy cells
        assert_eq!(hash.occupied_cell_count(), 2);
        assert_eq!(hash.pairs(), vec![[0, 1]]);
    }

    #[test]
    fn small_static_checks_its_own_span() {
        let mut hash = SpatialHash::new(1.0);
        // more occupied cells than the 27 the static spans
        for i in 0..40 {
            let center = m::Vec3::new(i as f64 * 3.0 + 0.5, 0.5, 0.5);
            hash.insert(i, cube(center, 0.4), false);
        }
        hash.insert(40, cube(m::Vec3::new(6.5, 0.5, 0.5), 1.0), true);
        assert_eq!(hash.pairs(), vec![[2, 40]]);
    }

    #[test]
    fn clear_resets_contents() {
        let mut hash = SpatialHash::new(1.0);
        hash.insert(0, cube(m::Vec3::zero(), 0.4), false);
        hash.insert(1, cube(m::Vec3::zero(), 0.4), false);
        hash.clear();
        assert!(hash.pairs().is_empty());
        assert_eq!(hash.occupied_cell_count(), 0);
    }

    #[test]
    fn no_false_negatives_against_brute_force() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for cell_size in [0.5, 1.0, 3.0] {
            let boxes: Vec<AABB> = (0..60)
                .map(|_| {
                    let c = m::Vec3::new(
                        rng.gen_range(-8.0..8.0),
                        rng.gen_range(-8.0..8.0),
                        rng.gen_range(-8.0..8.0),
                    );
                    let he = m::Vec3::new(
                        rng.gen_range(0.1..2.0),
                        rng.gen_range(0.1..2.0),
                        rng.gen_range(0.1..2.0),
                    );
                    AABB::from_center(c, he)
                })
                .collect();

            let mut hash = SpatialHash::new(cell_size);
            for (i, b) in boxes.iter().enumerate() {
                hash.insert(i, *b, false);
            }
            let pairs = hash.pairs();
            let pair_set: HashSet<[usize; 2]> = pairs.iter().copied().collect();
            assert_eq!(pair_set.len(), pairs.len(), "duplicate pairs");

            for i in 0..boxes.len() {
                for j in (i + 1)..boxes.len() {
                    if boxes[i].overlaps(&boxes[j]) {
                        assert!(pair_set.contains(&[i, j]), "missed pair {} {}", i, j);
                    }
                }
            }
        }
    }
}
