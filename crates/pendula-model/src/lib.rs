//! State, parameter and grid types for the pendula phase-space ensemble.
//!
//! `Grid` holds one double pendulum per cell, seeded from an `AngleWindow`.
//! `PhysicalParameters` is the read-only input to every integration step.
//! `SimParams` is the full, host-editable parameter set.

pub mod error;
pub mod params;
pub mod state;

pub use error::{Error, Result};
pub use params::{GRAVITY, ParamCode, ParamKind, ParamValue, PhysicalParameters, SimParams};
pub use state::{AngleWindow, Grid, PendulumState, grid_dims};
