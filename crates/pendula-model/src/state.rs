//! Per-cell pendulum state and the phase-space grid.
//!
//! A `Grid` is a row-major `width × height` array of [`PendulumState`].
//! Column `j` samples the first angle and row `i` the second angle of an
//! [`AngleWindow`]; every cell starts at rest.

use crate::error::{Error, Result};
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Canonical coordinates of one double pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PendulumState {
    /// Canonical momentum conjugate to `phi1`.
    pub p1: f64,
    /// Canonical momentum conjugate to `phi2`.
    pub p2: f64,
    /// Angle of the first link from the downward vertical (radians).
    pub phi1: f64,
    /// Angle of the second link from the downward vertical (radians).
    pub phi2: f64,
}

impl PendulumState {
    pub const fn new(p1: f64, p2: f64, phi1: f64, phi2: f64) -> Self {
        Self { p1, p2, phi1, phi2 }
    }

    /// A pendulum released from rest at the given angles.
    pub const fn at_rest(phi1: f64, phi2: f64) -> Self {
        Self::new(0.0, 0.0, phi1, phi2)
    }

    /// Pack as `[p1, p2, phi1, phi2]`.
    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(self.p1, self.p2, self.phi1, self.phi2)
    }

    pub fn from_vector(v: &Vector4<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Single-precision `[p1, p2, phi1, phi2]`, the layout GPU buffers use.
    pub fn to_f32(&self) -> [f32; 4] {
        [
            self.p1 as f32,
            self.p2 as f32,
            self.phi1 as f32,
            self.phi2 as f32,
        ]
    }

    pub fn from_f32(v: [f32; 4]) -> Self {
        Self::new(v[0] as f64, v[1] as f64, v[2] as f64, v[3] as f64)
    }

    pub fn is_finite(&self) -> bool {
        self.p1.is_finite() && self.p2.is_finite() && self.phi1.is_finite() && self.phi2.is_finite()
    }
}

impl From<Vector4<f64>> for PendulumState {
    fn from(v: Vector4<f64>) -> Self {
        Self::from_vector(&v)
    }
}

/// Range of initial angles sampled by a grid, in units of π.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleWindow {
    pub min_phi1: f64,
    pub max_phi1: f64,
    pub min_phi2: f64,
    pub max_phi2: f64,
}

impl Default for AngleWindow {
    fn default() -> Self {
        Self {
            min_phi1: -1.0,
            max_phi1: 1.0,
            min_phi2: -1.0,
            max_phi2: 1.0,
        }
    }
}

impl AngleWindow {
    /// Bounds in radians: `[min_phi1, max_phi1, min_phi2, max_phi2]`.
    pub fn radians(&self) -> [f64; 4] {
        [
            PI * self.min_phi1,
            PI * self.max_phi1,
            PI * self.min_phi2,
            PI * self.max_phi2,
        ]
    }

    /// Initial `phi1` of column `col` in a grid `width` cells wide.
    pub fn phi1_at(&self, col: usize, width: usize) -> f64 {
        let [lo, hi, _, _] = self.radians();
        lo + (col as f64 + 0.5) / width as f64 * (hi - lo)
    }

    /// Initial `phi2` of row `row` in a grid `height` cells tall.
    pub fn phi2_at(&self, row: usize, height: usize) -> f64 {
        let [_, _, lo, hi] = self.radians();
        lo + (row as f64 + 0.5) / height as f64 * (hi - lo)
    }
}

/// Validate host-supplied grid dimensions.
pub fn grid_dims(width: i32, height: i32) -> Result<(usize, usize)> {
    if width <= 0 || height <= 0 {
        return Err(Error::InvalidGrid {
            width: width as i64,
            height: height as i64,
        });
    }
    Ok((width as usize, height as usize))
}

/// Row-major grid of pendulum states.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<PendulumState>,
}

impl Grid {
    /// Seed a grid from an angle window. Momenta start at zero.
    pub fn seeded(width: usize, height: usize, window: &AngleWindow) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            let phi2 = window.phi2_at(row, height);
            for col in 0..width {
                cells.push(PendulumState::at_rest(window.phi1_at(col, width), phi2));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Wrap existing cells. `cells.len()` must equal `width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<PendulumState>) -> Self {
        assert_eq!(cells.len(), width * height, "cell count does not match grid size");
        Self {
            width,
            height,
            cells,
        }
    }

    /// Rebuild from a flat `[p1, p2, phi1, phi2]` per cell buffer.
    pub fn from_flat(width: usize, height: usize, data: &[f32]) -> Self {
        let cells = data
            .chunks_exact(4)
            .map(|c| PendulumState::from_f32([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::from_cells(width, height, cells)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&PendulumState> {
        if row < self.height && col < self.width {
            self.cells.get(self.index(row, col))
        } else {
            None
        }
    }

    pub fn cells(&self) -> &[PendulumState] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [PendulumState] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<PendulumState> {
        self.cells
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[PendulumState]> {
        self.cells.chunks_exact(self.width)
    }

    /// Flat single-precision read-back, `[p1, p2, phi1, phi2]` per cell.
    pub fn to_flat(&self) -> Vec<f32> {
        self.cells.iter().flat_map(|s| s.to_f32()).collect()
    }

    /// Copy out the `width × height` block whose top-left cell is `(row, col)`.
    ///
    /// The block must lie inside the grid.
    pub fn sub_grid(&self, row: usize, col: usize, width: usize, height: usize) -> Grid {
        assert!(row + height <= self.height && col + width <= self.width);
        let mut cells = Vec::with_capacity(width * height);
        for r in row..row + height {
            let start = self.index(r, col);
            cells.extend_from_slice(&self.cells[start..start + width]);
        }
        Grid::from_cells(width, height, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_dims_rejects_non_positive() {
        assert!(grid_dims(0, 4).is_err());
        assert!(grid_dims(4, -1).is_err());
        assert_eq!(grid_dims(3, 5).unwrap(), (3, 5));
    }

    #[test]
    fn test_seeding_cell_centres() {
        let window = AngleWindow::default();
        let grid = Grid::seeded(4, 4, &window);
        assert_eq!(grid.len(), 16);

        let first = grid.get(0, 0).unwrap();
        assert_relative_eq!(first.phi1, -0.75 * PI, epsilon = 1e-12);
        assert_relative_eq!(first.phi2, -0.75 * PI, epsilon = 1e-12);
        assert_eq!(first.p1, 0.0);
        assert_eq!(first.p2, 0.0);

        // Columns vary phi1 only, rows vary phi2 only.
        let right = grid.get(0, 3).unwrap();
        assert_relative_eq!(right.phi1, 0.75 * PI, epsilon = 1e-12);
        assert_relative_eq!(right.phi2, first.phi2, epsilon = 1e-12);
        let below = grid.get(3, 0).unwrap();
        assert_relative_eq!(below.phi1, first.phi1, epsilon = 1e-12);
        assert_relative_eq!(below.phi2, 0.75 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_grid_has_equilibrium_centre() {
        let grid = Grid::seeded(5, 5, &AngleWindow::default());
        let centre = grid.get(2, 2).unwrap();
        assert_eq!(*centre, PendulumState::default());
    }

    #[test]
    fn test_flat_layout() {
        let grid = Grid::from_cells(
            2,
            1,
            vec![
                PendulumState::new(1.0, 2.0, 3.0, 4.0),
                PendulumState::new(5.0, 6.0, 7.0, 8.0),
            ],
        );
        assert_eq!(grid.to_flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(Grid::from_flat(2, 1, &grid.to_flat()), grid);
    }

    #[test]
    fn test_sub_grid_block() {
        let grid = Grid::seeded(4, 3, &AngleWindow::default());
        let sub = grid.sub_grid(1, 2, 2, 2);
        assert_eq!(sub.width(), 2);
        assert_eq!(sub.height(), 2);
        assert_eq!(sub.get(0, 0), grid.get(1, 2));
        assert_eq!(sub.get(1, 1), grid.get(2, 3));
        assert_eq!(grid.sub_grid(0, 0, 4, 3), grid);
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn seeding_follows_window(
                width in 1usize..24,
                height in 1usize..24,
                min1 in -2.0..0.0_f64,
                max1 in 0.0..2.0_f64,
                min2 in -2.0..0.0_f64,
                max2 in 0.0..2.0_f64,
            ) {
                let window = AngleWindow { min_phi1: min1, max_phi1: max1, min_phi2: min2, max_phi2: max2 };
                let grid = Grid::seeded(width, height, &window);
                for row in 0..height {
                    for col in 0..width {
                        let s = grid.get(row, col).unwrap();
                        let phi1 = PI * (min1 + (col as f64 + 0.5) / width as f64 * (max1 - min1));
                        let phi2 = PI * (min2 + (row as f64 + 0.5) / height as f64 * (max2 - min2));
                        prop_assert!((s.phi1 - phi1).abs() < 1e-9, "phi1 {} vs {}", s.phi1, phi1);
                        prop_assert!((s.phi2 - phi2).abs() < 1e-9, "phi2 {} vs {}", s.phi2, phi2);
                        prop_assert_eq!(s.p1, 0.0);
                        prop_assert_eq!(s.p2, 0.0);
                    }
                }
            }
        }
    }
}
