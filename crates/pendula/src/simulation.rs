//! The simulation object a host drives frame by frame.
//!
//! A `Simulation` owns its parameters, the active backend and the trail.
//! Parameter changes go through [`Simulation::set`], which validates a
//! candidate copy first so a rejected change leaves everything untouched:
//!
//! - cadence fields (`dt`, `steps_per_frame`) take effect on the next step
//! - the crop origin clears the trail when it moves
//! - every other field reseeds the grid through `init_config`; flipping
//!   `use_gpu` rebuilds the backend instead

use crate::backend::Backend;
use crate::crop::CropWindow;
use crate::trail::{TrailBuffer, TrajectoryAccumulator};
use pendula_dynamics::{Scheme, energy_map};
use pendula_gpu::GpuContext;
use pendula_model::{
    Error, Grid, ParamCode, ParamKind, ParamValue, Result, SimParams, grid_dims,
};
use std::path::Path;
use tracing::{info, warn};

/// Trail image size used until the host picks one.
pub const DEFAULT_TRAIL_SIZE: (usize, usize) = (512, 512);

/// What one `view` produces: the full grid and the cropped block.
///
/// The updated trail is read through [`Simulation::trail`].
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub grid: Grid,
    pub sub_grid: Grid,
    /// Top-left `(row, col)` of `sub_grid` within `grid`.
    pub crop_start: (usize, usize),
}

pub struct Simulation {
    params: SimParams,
    backend: Backend,
    gpu: Option<GpuContext>,
    trail: TrajectoryAccumulator,
    steps_taken: u64,
}

impl Simulation {
    /// Build with the default RK4 scheme.
    pub fn new(params: SimParams) -> Result<Self> {
        Self::with_scheme(params, Scheme::default())
    }

    pub fn with_scheme(params: SimParams, scheme: Scheme) -> Result<Self> {
        validate(&params)?;
        let mut gpu = None;
        let backend = build_backend(&params, scheme, &mut gpu)?;
        let (trail_w, trail_h) = DEFAULT_TRAIL_SIZE;
        Ok(Self {
            params,
            backend,
            gpu,
            trail: TrajectoryAccumulator::new(trail_w, trail_h),
            steps_taken: 0,
        })
    }

    /// Load a (partial) JSON parameter file over the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(SimParams::from_json_file(path)?)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn scheme(&self) -> &Scheme {
        self.backend.scheme()
    }

    /// Swap the stepping algorithm. The grid is not reseeded.
    pub fn set_scheme(&mut self, scheme: Scheme) {
        info!(scheme = scheme.name(), "simulation: scheme changed");
        self.backend.set_scheme(scheme);
    }

    pub fn trail(&self) -> &TrailBuffer {
        self.trail.trail()
    }

    pub fn trail_mut(&mut self) -> &mut TrajectoryAccumulator {
        &mut self.trail
    }

    /// Steps taken since construction.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn get(&self, code: ParamCode) -> ParamValue {
        self.params.get(code)
    }

    /// Like [`get`](Self::get) but by raw integer code.
    pub fn get_raw(&self, code: i32) -> Result<ParamValue> {
        Ok(self.get(ParamCode::try_from(code)?))
    }

    /// Set one parameter and apply its side effects.
    pub fn set(&mut self, code: ParamCode, value: ParamValue) -> Result<()> {
        let result = self.apply(code, value);
        if let Err(e) = &result {
            warn!(param = code.name(), error = %e, "simulation: change rejected");
        }
        result
    }

    pub fn set_raw(&mut self, code: i32, value: ParamValue) -> Result<()> {
        self.set(ParamCode::try_from(code)?, value)
    }

    fn apply(&mut self, code: ParamCode, value: ParamValue) -> Result<()> {
        let mut candidate = self.params.clone();
        candidate.set(code, value)?;
        validate(&candidate)?;

        match code.kind() {
            ParamKind::Cadence => {}
            ParamKind::View => {
                if candidate.crop_origin != self.params.crop_origin {
                    self.trail.clear();
                }
            }
            ParamKind::Configuration => {
                if candidate.use_gpu != self.params.use_gpu {
                    let scheme = self.backend.scheme().clone();
                    self.backend = build_backend(&candidate, scheme, &mut self.gpu)?;
                    info!(backend = self.backend.name(), "simulation: backend switched");
                } else {
                    self.backend.init_config(
                        candidate.grid_width,
                        candidate.grid_height,
                        &candidate.angle_window(),
                    )?;
                }
                self.trail.clear();
            }
        }

        self.params = candidate;
        Ok(())
    }

    /// Move the crop origin, e.g. from a cursor position in `[0, 1]²`.
    pub fn select_crop_origin(&mut self, x: f64, y: f64) -> Result<()> {
        self.set(ParamCode::CropOrigin, ParamValue::Vec2([x, y]))
    }

    pub fn crop_origin(&self) -> [f64; 2] {
        self.params.crop_origin
    }

    pub fn crop_window(&self) -> Result<CropWindow> {
        CropWindow::from_params(&self.params)
    }

    /// Advance every cell by one step of `dt`.
    pub fn time_step(&mut self) {
        self.backend.step(&self.params.physical(), self.params.dt);
        self.steps_taken += 1;
    }

    /// Read the grid, crop it and advance the trail by one frame.
    pub fn view(&mut self) -> Result<View> {
        let grid = self.backend.read()?;
        let crop = self.crop_window()?;
        let crop_start = crop.top_left(grid.width(), grid.height())?;
        let sub_grid = crop.select(&grid)?;
        self.trail.advance(&sub_grid, &self.params.physical());
        Ok(View {
            grid,
            sub_grid,
            crop_start,
        })
    }

    /// `steps_per_frame` steps followed by one `view`.
    pub fn frame(&mut self) -> Result<View> {
        for _ in 0..self.params.steps_per_frame {
            self.time_step();
        }
        self.view()
    }

    /// Current grid without touching the trail.
    pub fn read(&self) -> Result<Grid> {
        self.backend.read()
    }

    /// Flat `[p1, p2, phi1, phi2]` per cell, row-major.
    pub fn read_flat(&self) -> Result<Vec<f32>> {
        Ok(self.read()?.to_flat())
    }

    pub fn energy_map(&self) -> Result<Vec<f64>> {
        Ok(energy_map(&self.read()?, &self.params.physical()))
    }

    /// Reseed with the current parameters.
    pub fn reset(&mut self) -> Result<()> {
        self.backend.init_config(
            self.params.grid_width,
            self.params.grid_height,
            &self.params.angle_window(),
        )?;
        self.trail.clear();
        Ok(())
    }
}

/// Checks that cannot be expressed by the value type alone.
fn validate(params: &SimParams) -> Result<()> {
    let (width, height) = grid_dims(params.grid_width, params.grid_height)?;
    CropWindow::from_params(params)?.check_fits(width, height)?;
    if params.steps_per_frame < 0 {
        return Err(Error::NegativeStepCount(params.steps_per_frame));
    }
    Ok(())
}

/// Create the backend `params.use_gpu` asks for, acquiring a device on
/// first use and caching it in `gpu`.
fn build_backend(
    params: &SimParams,
    scheme: Scheme,
    gpu: &mut Option<GpuContext>,
) -> Result<Backend> {
    let window = params.angle_window();
    let (w, h) = (params.grid_width, params.grid_height);
    if !params.use_gpu {
        return Backend::cpu(w, h, &window, scheme);
    }
    let context = match gpu.take() {
        Some(context) => context,
        None => GpuContext::new()?,
    };
    let backend = Backend::gpu(&context, w, h, &window, scheme);
    *gpu = Some(context);
    backend
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_params() -> SimParams {
        SimParams {
            use_gpu: false,
            grid_width: 6,
            grid_height: 4,
            sub_grid_width: 2,
            sub_grid_height: 2,
            ..SimParams::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&cpu_params()).is_ok());
        assert!(matches!(
            validate(&SimParams {
                grid_width: 0,
                ..cpu_params()
            }),
            Err(Error::InvalidGrid { .. })
        ));
        assert!(matches!(
            validate(&SimParams {
                sub_grid_width: 7,
                ..cpu_params()
            }),
            Err(Error::CropTooLarge { .. })
        ));
        assert!(matches!(
            validate(&SimParams {
                steps_per_frame: -1,
                ..cpu_params()
            }),
            Err(Error::NegativeStepCount(-1))
        ));
    }

    #[test]
    fn test_view_reports_crop_start() {
        let mut sim = Simulation::new(cpu_params()).unwrap();
        let view = sim.view().unwrap();
        assert_eq!(view.crop_start, (2, 3));
        assert_eq!(view.sub_grid.get(0, 0), view.grid.get(2, 3));
        assert!(!sim.trail().is_blank());
    }

    #[test]
    fn test_reset_reseeds() {
        let mut sim = Simulation::new(cpu_params()).unwrap();
        let seeded = sim.read().unwrap();
        sim.time_step();
        assert_ne!(sim.read().unwrap(), seeded);
        sim.reset().unwrap();
        assert_eq!(sim.read().unwrap(), seeded);
    }
}
