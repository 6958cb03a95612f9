//! Double-pendulum dynamics and the sequential CPU backend.
//!
//! - [`hamiltonian`]: `(p1, p2, φ1, φ2) → (ṗ1, ṗ2, φ̇1, φ̇2)`, energy, bob positions
//! - [`scheme`]: RK4, forward Euler and splitting schemes
//! - [`cpu`]: row-major grid integrator in `f64`

pub mod cpu;
pub mod hamiltonian;
pub mod scheme;

pub use cpu::CpuIntegrator;
pub use hamiltonian::{
    BobPositions, bob_positions, derivative, energy, kinetic_energy, potential_energy,
};
pub use scheme::{
    Scheme, SplittingScheme, SubStep, SubStepKind, euler_step, rk4_step, splitting_step,
};

use pendula_model::{Grid, PhysicalParameters};

/// Per-cell energy map, row-major like the grid.
pub fn energy_map(grid: &Grid, params: &PhysicalParameters) -> Vec<f64> {
    grid.cells().iter().map(|s| energy(s, params)).collect()
}
