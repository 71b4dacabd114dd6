//! Three-dimensional scalar field shared by every agent.
//!
//! Cells live behind an `Arc` so a published snapshot can hold the grid of a
//! finished tick while the engine keeps writing: the first write after a
//! freeze copies the cells once (`Arc::make_mut`) and later writes in the same
//! tick are in place. Readers never see a half-updated grid.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Immutable view of the grid as it was when it was frozen.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FieldGrid {
    pub extent: usize,
    pub cells: Arc<Vec<f32>>,
}

impl FieldGrid {
    #[inline(always)]
    fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.extent + iy) * self.extent + iz
    }

    /// Value at integer cell coordinates, `None` outside the grid.
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Option<f32> {
        if ix < self.extent && iy < self.extent && iz < self.extent {
            Some(self.cells[self.index(ix, iy, iz)])
        } else {
            None
        }
    }

    /// Value of the cell containing `(x, y, z)`.
    pub fn sample(&self, x: f64, y: f64, z: f64) -> Option<f32> {
        let [ix, iy, iz] = cell_of(self.extent, x, y, z)?;
        self.get(ix, iy, iz)
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().map(|&c| c as f64).sum()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Truncates a continuous position to its cell, rejecting anything outside
/// `[0, extent)` on any axis (including NaN and infinities).
pub fn cell_of(extent: usize, x: f64, y: f64, z: f64) -> Option<[usize; 3]> {
    let bound = 0.0..extent as f64;
    if bound.contains(&x) && bound.contains(&y) && bound.contains(&z) {
        Some([x as usize, y as usize, z as usize])
    } else {
        None
    }
}

/// Live, mutable field owned by the simulation engine.
#[derive(Clone, Debug)]
pub struct ScalarField {
    extent: usize,
    cells: Arc<Vec<f32>>,
}

impl ScalarField {
    pub fn new(extent: usize) -> Self {
        Self {
            extent,
            cells: Arc::new(vec![0.0; extent * extent * extent]),
        }
    }

    pub fn extent(&self) -> usize {
        self.extent
    }

    #[inline(always)]
    fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.extent + iy) * self.extent + iz
    }

    pub fn cell_of(&self, x: f64, y: f64, z: f64) -> Option<[usize; 3]> {
        cell_of(self.extent, x, y, z)
    }

    /// Adds `delta` to the cell containing `(x, y, z)`.
    ///
    /// Out-of-range coordinates are dropped silently, as is any write that
    /// would leave the cell non-finite. The return value only reports whether
    /// a cell was touched.
    pub fn write(&mut self, x: f64, y: f64, z: f64, delta: f32) -> bool {
        let Some([ix, iy, iz]) = self.cell_of(x, y, z) else {
            return false;
        };
        let idx = self.index(ix, iy, iz);
        let updated = self.cells[idx] + delta;
        if !updated.is_finite() {
            return false;
        }
        Arc::make_mut(&mut self.cells)[idx] = updated;
        true
    }

    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> Option<f32> {
        if ix < self.extent && iy < self.extent && iz < self.extent {
            Some(self.cells[self.index(ix, iy, iz)])
        } else {
            None
        }
    }

    /// Freezes the current cells. O(1): the grid is shared until the next write.
    pub fn read_all(&self) -> FieldGrid {
        FieldGrid {
            extent: self.extent,
            cells: Arc::clone(&self.cells),
        }
    }

    /// Central-difference gradient around a cell over its 6-neighbourhood.
    /// Neighbours beyond the boundary count as zero intensity.
    pub fn gradient(&self, [ix, iy, iz]: [usize; 3]) -> [f64; 3] {
        let at = |x: isize, y: isize, z: isize| -> f64 {
            if x < 0 || y < 0 || z < 0 {
                return 0.0;
            }
            self.get(x as usize, y as usize, z as usize)
                .map_or(0.0, f64::from)
        };
        let (x, y, z) = (ix as isize, iy as isize, iz as isize);
        [
            (at(x + 1, y, z) - at(x - 1, y, z)) * 0.5,
            (at(x, y + 1, z) - at(x, y - 1, z)) * 0.5,
            (at(x, y, z + 1) - at(x, y, z - 1)) * 0.5,
        ]
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().map(|&c| c as f64).sum()
    }
}
