//! pendula: dense double-pendulum ensembles in phase space.
//!
//! Every cell of a `width × height` grid is an independent double
//! pendulum released from rest; its column picks the first angle and its
//! row the second. This is the umbrella crate: it ties a CPU or GPU
//! backend to a crop selector and a fading trail image behind
//! [`Simulation`], and re-exports the building blocks.
//!
//! ```no_run
//! use pendula::{ParamCode, ParamValue, SimParams, Simulation};
//!
//! let mut sim = Simulation::new(SimParams { use_gpu: false, ..SimParams::default() })?;
//! sim.set(ParamCode::StepsPerFrame, ParamValue::Int(20))?;
//! let view = sim.frame()?;
//! println!("{} cells, trail {}x{}", view.grid.len(), sim.trail().width(), sim.trail().height());
//! # Ok::<(), pendula::Error>(())
//! ```

pub mod backend;
pub mod crop;
pub mod simulation;
pub mod trail;

pub use pendula_dynamics::{
    self, BobPositions, CpuIntegrator, Scheme, SplittingScheme, SubStep, SubStepKind,
    bob_positions, derivative, energy, energy_map,
};
pub use pendula_gpu::{self, GpuContext, GpuIntegrator};
pub use pendula_model::{
    self, AngleWindow, Error, Grid, ParamCode, ParamKind, ParamValue, PendulumState,
    PhysicalParameters, Result, SimParams,
};

pub use backend::Backend;
pub use crop::CropWindow;
pub use simulation::{DEFAULT_TRAIL_SIZE, Simulation, View};
pub use trail::{Marker, TrailBuffer, TrailStyle, TrajectoryAccumulator};
