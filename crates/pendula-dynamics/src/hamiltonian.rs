//! Double-pendulum dynamics in canonical coordinates.
//!
//! With `Δ = φ1 − φ2` the kinetic energy is `K = pᵀ M⁻¹ p / 2` where
//!
//! ```text
//! M11 = (m1 + m2)·l1²   M12 = M21 = m2·l1·l2·cos Δ   M22 = m2·l2²
//! ```
//!
//! and the potential is `V = −(m1 + m2)·g·l1·cos φ1 − m2·g·l2·cos φ2`.
//! Hamilton's equations give `φ̇ = ∂H/∂p` and `ṗ = −∂H/∂φ`.
//!
//! `det M = 0` only for degenerate masses or lengths. The result is then
//! non-finite and is left to propagate through that cell.

use nalgebra::Vector2;
use pendula_model::{PendulumState, PhysicalParameters};

/// Mass-matrix entries and determinant at a given angle difference.
struct MassMatrix {
    m11: f64,
    m12: f64,
    m22: f64,
    /// `M12·M21 − M11·M22`, negative for non-degenerate parameters.
    det: f64,
}

impl MassMatrix {
    fn new(params: &PhysicalParameters, delta: f64) -> Self {
        let PhysicalParameters {
            mass1: m1,
            mass2: m2,
            length1: l1,
            length2: l2,
            ..
        } = *params;
        let m11 = (m1 + m2) * l1 * l1;
        let m12 = m2 * l1 * l2 * delta.cos();
        let m22 = m2 * l2 * l2;
        Self {
            m11,
            m12,
            m22,
            det: m12 * m12 - m22 * m11,
        }
    }

    /// `pᵀ M⁻¹ p · det(M)` up to sign: `M22·p1² + M11·p2² − 2·M12·p1·p2`.
    fn quadratic(&self, p1: f64, p2: f64) -> f64 {
        self.m22 * p1 * p1 + self.m11 * p2 * p2 - 2.0 * self.m12 * p1 * p2
    }
}

/// Time derivative `(ṗ1, ṗ2, φ̇1, φ̇2)` of a state, returned in state layout.
pub fn derivative(state: &PendulumState, params: &PhysicalParameters) -> PendulumState {
    let PendulumState { p1, p2, phi1, phi2 } = *state;
    let PhysicalParameters {
        mass1: m1,
        mass2: m2,
        length1: l1,
        length2: l2,
        gravity: g,
    } = *params;

    let delta = phi1 - phi2;
    let m = MassMatrix::new(params, delta);

    let dphi1 = (-m.m22 * p1 + m.m12 * p2) / m.det;
    let dphi2 = (m.m12 * p1 - m.m11 * p2) / m.det;

    // ∂K/∂Δ; Δ enters φ1 with + and φ2 with −.
    let dk = m2 * l1 * l2 * delta.sin()
        * (p1 * p2 / -m.det - m.quadratic(p1, p2) * m.m12 / (m.det * m.det));

    let dp1 = -dk - (m1 + m2) * g * l1 * phi1.sin();
    let dp2 = dk - m2 * g * l2 * phi2.sin();

    PendulumState::new(dp1, dp2, dphi1, dphi2)
}

/// Kinetic energy `pᵀ M⁻¹ p / 2`.
pub fn kinetic_energy(state: &PendulumState, params: &PhysicalParameters) -> f64 {
    let m = MassMatrix::new(params, state.phi1 - state.phi2);
    m.quadratic(state.p1, state.p2) / (-2.0 * m.det)
}

/// Potential energy with the pivot as reference height.
pub fn potential_energy(state: &PendulumState, params: &PhysicalParameters) -> f64 {
    let PhysicalParameters {
        mass1: m1,
        mass2: m2,
        length1: l1,
        length2: l2,
        gravity: g,
    } = *params;
    -(m1 + m2) * g * l1 * state.phi1.cos() - m2 * g * l2 * state.phi2.cos()
}

/// Total mechanical energy, the value of the Hamiltonian.
pub fn energy(state: &PendulumState, params: &PhysicalParameters) -> f64 {
    kinetic_energy(state, params) + potential_energy(state, params)
}

/// Cartesian bob positions, pivot at the origin, `y` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BobPositions {
    pub first: Vector2<f64>,
    pub second: Vector2<f64>,
}

pub fn bob_positions(state: &PendulumState, params: &PhysicalParameters) -> BobPositions {
    let first = Vector2::new(
        params.length1 * state.phi1.sin(),
        -params.length1 * state.phi1.cos(),
    );
    let second = first
        + Vector2::new(
            params.length2 * state.phi2.sin(),
            -params.length2 * state.phi2.cos(),
        );
    BobPositions { first, second }
}
