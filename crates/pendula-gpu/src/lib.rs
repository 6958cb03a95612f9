//! wgpu compute backend for the pendula ensemble.
//!
//! Mirrors the CPU integrator's `init_config`, `step` and `read` in
//! single precision. Acquire a [`GpuContext`] once and share it between
//! integrators.

pub mod context;
pub mod gpu_integrator;
pub mod gpu_state;
pub mod shaders;

pub use context::GpuContext;
pub use gpu_integrator::GpuIntegrator;
pub use gpu_state::{GpuState, Slot};
