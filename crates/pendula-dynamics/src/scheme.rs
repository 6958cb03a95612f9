//! Fixed-step integration schemes over `(state, params, dt) → state`.
//!
//! Every scheme is expressed through the same two primitives, a
//! derivative evaluation and a weighted Euler update, so the GPU backend
//! can encode it as a sequence of kernel dispatches.

use crate::hamiltonian::derivative;
use nalgebra::Vector4;
use pendula_model::{PendulumState, PhysicalParameters};

/// Which half of the state a splitting sub-step advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubStepKind {
    /// Advance the angles `φ` with `φ̇`.
    Position,
    /// Advance the momenta `p` with `ṗ`.
    Momentum,
}

/// One weighted sub-step of a splitting scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubStep {
    pub kind: SubStepKind,
    pub weight: f64,
}

impl SubStep {
    pub const fn position(weight: f64) -> Self {
        Self {
            kind: SubStepKind::Position,
            weight,
        }
    }

    pub const fn momentum(weight: f64) -> Self {
        Self {
            kind: SubStepKind::Momentum,
            weight,
        }
    }

    /// Per-component weights in `[p1, p2, phi1, phi2]` layout.
    pub fn mask(&self) -> [f64; 4] {
        let w = self.weight;
        match self.kind {
            SubStepKind::Position => [0.0, 0.0, w, w],
            SubStepKind::Momentum => [w, w, 0.0, 0.0],
        }
    }
}

/// An ordered composition of position and momentum sub-steps.
///
/// Sub-steps run in order; each re-evaluates the derivative at the
/// current intermediate state.
#[derive(Debug, Clone, PartialEq)]
pub struct SplittingScheme {
    steps: Vec<SubStep>,
}

impl SplittingScheme {
    pub fn new(steps: Vec<SubStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[SubStep] {
        &self.steps
    }

    /// First-order: kick then drift.
    pub fn symplectic_euler() -> Self {
        Self::new(vec![SubStep::momentum(1.0), SubStep::position(1.0)])
    }

    /// Kick-drift-kick leapfrog.
    pub fn leapfrog() -> Self {
        Self::new(vec![
            SubStep::momentum(0.5),
            SubStep::position(1.0),
            SubStep::momentum(0.5),
        ])
    }

    /// Ruth's third-order six-stage composition.
    pub fn ruth3() -> Self {
        Self::new(vec![
            SubStep::momentum(7.0 / 24.0),
            SubStep::position(2.0 / 3.0),
            SubStep::momentum(3.0 / 4.0),
            SubStep::position(-2.0 / 3.0),
            SubStep::momentum(-1.0 / 24.0),
            SubStep::position(1.0),
        ])
    }

    /// Forest–Ruth fourth-order composition.
    pub fn forest_ruth() -> Self {
        let theta = 1.0 / (2.0 - 2.0_f64.cbrt());
        Self::new(vec![
            SubStep::position(theta / 2.0),
            SubStep::momentum(theta),
            SubStep::position((1.0 - theta) / 2.0),
            SubStep::momentum(1.0 - 2.0 * theta),
            SubStep::position((1.0 - theta) / 2.0),
            SubStep::momentum(theta),
            SubStep::position(theta / 2.0),
        ])
    }

    /// Sum of weights per kind: `(position, momentum)`. Both are 1 for a
    /// consistent scheme.
    pub fn total_weights(&self) -> (f64, f64) {
        self.steps.iter().fold((0.0, 0.0), |(x, p), s| match s.kind {
            SubStepKind::Position => (x + s.weight, p),
            SubStepKind::Momentum => (x, p + s.weight),
        })
    }
}

/// The stepping algorithm used by a backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scheme {
    /// Classical fourth-order Runge–Kutta.
    #[default]
    Rk4,
    ForwardEuler,
    Splitting(SplittingScheme),
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Rk4 => "rk4",
            Scheme::ForwardEuler => "forward_euler",
            Scheme::Splitting(_) => "splitting",
        }
    }

    /// Advance one pendulum by `dt`.
    pub fn advance(
        &self,
        state: &PendulumState,
        params: &PhysicalParameters,
        dt: f64,
    ) -> PendulumState {
        match self {
            Scheme::Rk4 => rk4_step(state, params, dt),
            Scheme::ForwardEuler => euler_step(state, params, dt),
            Scheme::Splitting(scheme) => splitting_step(scheme, state, params, dt),
        }
    }
}

fn f(q: &Vector4<f64>, params: &PhysicalParameters) -> Vector4<f64> {
    derivative(&PendulumState::from_vector(q), params).to_vector()
}

/// `q' = q + dt/6 · (k1 + 2k2 + 2k3 + k4)`.
pub fn rk4_step(state: &PendulumState, params: &PhysicalParameters, dt: f64) -> PendulumState {
    let q = state.to_vector();
    let k1 = f(&q, params);
    let k2 = f(&(q + k1 * (dt / 2.0)), params);
    let k3 = f(&(q + k2 * (dt / 2.0)), params);
    let k4 = f(&(q + k3 * dt), params);
    PendulumState::from_vector(&(q + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)))
}

pub fn euler_step(state: &PendulumState, params: &PhysicalParameters, dt: f64) -> PendulumState {
    let q = state.to_vector();
    PendulumState::from_vector(&(q + f(&q, params) * dt))
}

pub fn splitting_step(
    scheme: &SplittingScheme,
    state: &PendulumState,
    params: &PhysicalParameters,
    dt: f64,
) -> PendulumState {
    let mut q = state.to_vector();
    for step in scheme.steps() {
        let w = Vector4::from(step.mask());
        q += f(&q, params).component_mul(&w) * dt;
    }
    PendulumState::from_vector(&q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::energy;
    use approx::assert_relative_eq;

    fn run(scheme: &Scheme, state: PendulumState, dt: f64, steps: usize) -> PendulumState {
        let params = PhysicalParameters::default();
        (0..steps).fold(state, |s, _| scheme.advance(&s, &params, dt))
    }

    fn distance(a: &PendulumState, b: &PendulumState) -> f64 {
        (a.to_vector() - b.to_vector()).norm()
    }

    #[test]
    fn test_presets_are_consistent() {
        for scheme in [
            SplittingScheme::symplectic_euler(),
            SplittingScheme::leapfrog(),
            SplittingScheme::ruth3(),
            SplittingScheme::forest_ruth(),
        ] {
            let (x, p) = scheme.total_weights();
            assert_relative_eq!(x, 1.0, epsilon = 1e-12);
            assert_relative_eq!(p, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sub_step_masks() {
        assert_eq!(SubStep::position(0.5).mask(), [0.0, 0.0, 0.5, 0.5]);
        assert_eq!(SubStep::momentum(2.0).mask(), [2.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_equilibrium_fixed_for_every_scheme() {
        for scheme in [
            Scheme::Rk4,
            Scheme::ForwardEuler,
            Scheme::Splitting(SplittingScheme::ruth3()),
        ] {
            let end = run(&scheme, PendulumState::default(), 0.01, 100);
            assert_eq!(end, PendulumState::default(), "{}", scheme.name());
        }
    }

    #[test]
    fn test_rk4_fourth_order_convergence() {
        let start = PendulumState::at_rest(0.1, 0.05);
        let t = 1.0;
        let reference = run(&Scheme::Rk4, start, 1e-4, 10_000);

        let coarse = distance(&run(&Scheme::Rk4, start, t / 50.0, 50), &reference);
        let fine = distance(&run(&Scheme::Rk4, start, t / 100.0, 100), &reference);
        let ratio = coarse / fine;
        assert!(
            (10.0..22.0).contains(&ratio),
            "halving dt should cut the error ~16x, got {ratio} ({coarse:e} -> {fine:e})"
        );
    }

    #[test]
    fn test_splitting_tracks_rk4_over_short_interval() {
        let start = PendulumState::at_rest(0.1, 0.05);
        let reference = run(&Scheme::Rk4, start, 1e-4, 1000);
        for scheme in [SplittingScheme::ruth3(), SplittingScheme::forest_ruth()] {
            let end = run(&Scheme::Splitting(scheme), start, 1e-4, 1000);
            assert!(distance(&end, &reference) < 1e-3);
            assert_ne!(end, start);
        }
    }

    #[test]
    fn test_rk4_energy_drift_is_small() {
        let params = PhysicalParameters::default();
        let start = PendulumState::at_rest(0.3, 0.2);
        let e0 = energy(&start, &params);
        let end = run(&Scheme::Rk4, start, 0.001, 10_000);
        let drift = (energy(&end, &params) - e0).abs() / e0.abs();
        assert!(drift < 1e-6, "relative energy drift {drift:e}");
    }

    #[test]
    fn test_forward_euler_gains_energy() {
        let params = PhysicalParameters::default();
        let start = PendulumState::at_rest(0.3, 0.2);
        let e0 = energy(&start, &params);
        let end = run(&Scheme::ForwardEuler, start, 0.001, 10_000);
        assert!(energy(&end, &params) > e0);
    }
}
