//! Sequential CPU backend.
//!
//! Holds the grid in double precision and advances cells one at a time in
//! row-major order.

use crate::scheme::Scheme;
use pendula_model::{AngleWindow, Error, Grid, PhysicalParameters, Result, grid_dims};
use tracing::debug;

pub struct CpuIntegrator {
    grid: Grid,
    scheme: Scheme,
}

impl CpuIntegrator {
    /// Create an integrator with a seeded `width × height` grid.
    pub fn new(width: i32, height: i32, window: &AngleWindow, scheme: Scheme) -> Result<Self> {
        let (width, height) = grid_dims(width, height)?;
        Ok(Self {
            grid: Grid::seeded(width, height, window),
            scheme,
        })
    }

    /// Reallocate and reseed. On error the current grid is kept.
    pub fn init_config(&mut self, width: i32, height: i32, window: &AngleWindow) -> Result<()> {
        let (width, height) = grid_dims(width, height)?;
        debug!(width, height, ?window, "cpu: reseeding grid");
        self.grid = Grid::seeded(width, height, window);
        Ok(())
    }

    /// Advance every cell by one step of the current scheme.
    pub fn step(&mut self, params: &PhysicalParameters, dt: f64) {
        for cell in self.grid.cells_mut() {
            *cell = self.scheme.advance(cell, params, dt);
        }
    }

    /// Snapshot of the current grid.
    pub fn read(&self) -> Grid {
        self.grid.clone()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Replace the state with an arbitrary grid of the same shape.
    pub fn upload(&mut self, grid: &Grid) -> Result<()> {
        if grid.width() != self.grid.width() || grid.height() != self.grid.height() {
            return Err(Error::InvalidGrid {
                width: grid.width() as i64,
                height: grid.height() as i64,
            });
        }
        self.grid = grid.clone();
        Ok(())
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::derivative;
    use crate::scheme::rk4_step;
    use pendula_model::PendulumState;
    use std::f64::consts::PI;

    #[test]
    fn test_rejects_non_positive_size_and_keeps_state() {
        let window = AngleWindow::default();
        assert!(CpuIntegrator::new(0, 4, &window, Scheme::Rk4).is_err());

        let mut cpu = CpuIntegrator::new(3, 2, &window, Scheme::Rk4).unwrap();
        cpu.step(&PhysicalParameters::default(), 0.01);
        let before = cpu.read();
        assert!(cpu.init_config(-2, 5, &window).is_err());
        assert_eq!(cpu.read(), before);
    }

    #[test]
    fn test_init_config_resizes_and_reseeds() {
        let window = AngleWindow::default();
        let mut cpu = CpuIntegrator::new(4, 4, &window, Scheme::Rk4).unwrap();
        cpu.step(&PhysicalParameters::default(), 0.01);
        cpu.init_config(6, 3, &window).unwrap();
        assert_eq!(cpu.read(), Grid::seeded(6, 3, &window));
    }

    #[test]
    fn test_single_step_four_by_four() {
        let params = PhysicalParameters::default();
        let mut cpu = CpuIntegrator::new(4, 4, &AngleWindow::default(), Scheme::Rk4).unwrap();
        let start = cpu.read();
        cpu.step(&params, 0.001);
        let grid = cpu.read();

        let corner = grid.get(0, 0).unwrap();
        assert!((start.get(0, 0).unwrap().phi1 + 0.75 * PI).abs() < 1e-12);
        assert!(corner.p1 != 0.0);
        assert!(corner.p1 > 0.0);

        // Cells are independent: each matches a lone pendulum.
        for (before, after) in start.cells().iter().zip(grid.cells()) {
            assert_eq!(*after, rk4_step(before, &params, 0.001));
        }
    }

    #[test]
    fn test_equilibrium_cell_stays_put() {
        let params = PhysicalParameters::default();
        let mut cpu = CpuIntegrator::new(5, 5, &AngleWindow::default(), Scheme::Rk4).unwrap();
        for _ in 0..100 {
            cpu.step(&params, 0.001);
        }
        assert_eq!(*cpu.grid().get(2, 2).unwrap(), PendulumState::default());
        assert_ne!(*cpu.grid().get(0, 0).unwrap(), PendulumState::default());
    }

    #[test]
    fn test_degenerate_cell_does_not_stop_the_grid() {
        let params = PhysicalParameters {
            mass2: 0.0,
            ..PhysicalParameters::default()
        };
        let mut cpu = CpuIntegrator::new(2, 2, &AngleWindow::default(), Scheme::Rk4).unwrap();
        cpu.step(&params, 0.001);
        assert!(cpu.grid().cells().iter().all(|s| !s.is_finite()));
        assert!(!derivative(&PendulumState::new(0.0, 0.0, 0.1, 0.2), &params).is_finite());
    }

    #[test]
    fn test_upload_requires_same_shape() {
        let window = AngleWindow::default();
        let mut cpu = CpuIntegrator::new(2, 2, &window, Scheme::Rk4).unwrap();
        assert!(cpu.upload(&Grid::seeded(3, 2, &window)).is_err());
        let custom = Grid::from_cells(2, 2, vec![PendulumState::new(1.0, 0.0, 0.0, 0.0); 4]);
        cpu.upload(&custom).unwrap();
        assert_eq!(cpu.read(), custom);
    }
}
