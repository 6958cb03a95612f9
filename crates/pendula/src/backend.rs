//! Runtime choice between the CPU and GPU integrators.

use pendula_dynamics::{CpuIntegrator, Scheme};
use pendula_gpu::{GpuContext, GpuIntegrator};
use pendula_model::{AngleWindow, Grid, PhysicalParameters, Result};
use tracing::info;

/// One of the two interchangeable integrators.
///
/// Both expose `init_config`, `step` and `read` with the same meaning;
/// there is no state transfer between them.
pub enum Backend {
    Cpu(CpuIntegrator),
    Gpu(GpuIntegrator),
}

impl Backend {
    pub fn cpu(width: i32, height: i32, window: &AngleWindow, scheme: Scheme) -> Result<Self> {
        let integrator = CpuIntegrator::new(width, height, window, scheme)?;
        info!(width, height, "backend: cpu ready");
        Ok(Backend::Cpu(integrator))
    }

    pub fn gpu(
        context: &GpuContext,
        width: i32,
        height: i32,
        window: &AngleWindow,
        scheme: Scheme,
    ) -> Result<Self> {
        let integrator = GpuIntegrator::new(context, width, height, window, scheme)?;
        info!(width, height, adapter = %context.adapter_name, "backend: gpu ready");
        Ok(Backend::Gpu(integrator))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Cpu(_) => "cpu",
            Backend::Gpu(_) => "gpu",
        }
    }

    pub fn is_gpu(&self) -> bool {
        matches!(self, Backend::Gpu(_))
    }

    pub fn width(&self) -> usize {
        match self {
            Backend::Cpu(cpu) => cpu.grid().width(),
            Backend::Gpu(gpu) => gpu.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Backend::Cpu(cpu) => cpu.grid().height(),
            Backend::Gpu(gpu) => gpu.height(),
        }
    }

    pub fn init_config(&mut self, width: i32, height: i32, window: &AngleWindow) -> Result<()> {
        match self {
            Backend::Cpu(cpu) => cpu.init_config(width, height, window),
            Backend::Gpu(gpu) => gpu.init_config(width, height, window),
        }
    }

    pub fn step(&mut self, params: &PhysicalParameters, dt: f64) {
        match self {
            Backend::Cpu(cpu) => cpu.step(params, dt),
            Backend::Gpu(gpu) => gpu.step(params, dt),
        }
    }

    /// Current grid as host memory. Blocks on the GPU read-back.
    pub fn read(&self) -> Result<Grid> {
        match self {
            Backend::Cpu(cpu) => Ok(cpu.read()),
            Backend::Gpu(gpu) => gpu.read(),
        }
    }

    pub fn scheme(&self) -> &Scheme {
        match self {
            Backend::Cpu(cpu) => cpu.scheme(),
            Backend::Gpu(gpu) => gpu.scheme(),
        }
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        match self {
            Backend::Cpu(cpu) => cpu.set_scheme(scheme),
            Backend::Gpu(gpu) => gpu.set_scheme(scheme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_backend_contract() {
        let window = AngleWindow::default();
        let mut backend = Backend::cpu(3, 2, &window, Scheme::Rk4).unwrap();
        assert_eq!(backend.name(), "cpu");
        assert!(!backend.is_gpu());
        assert_eq!((backend.width(), backend.height()), (3, 2));

        let seeded = backend.read().unwrap();
        backend.step(&PhysicalParameters::default(), 0.01);
        assert_ne!(backend.read().unwrap(), seeded);

        backend.init_config(3, 2, &window).unwrap();
        assert_eq!(backend.read().unwrap(), seeded);
    }

    #[test]
    fn test_rejected_init_config_keeps_grid() {
        let window = AngleWindow::default();
        let mut backend = Backend::cpu(4, 4, &window, Scheme::Rk4).unwrap();
        assert!(backend.init_config(-1, 4, &window).is_err());
        assert_eq!((backend.width(), backend.height()), (4, 4));
    }

    #[test]
    fn test_scheme_swap() {
        let mut backend = Backend::cpu(1, 1, &AngleWindow::default(), Scheme::Rk4).unwrap();
        backend.set_scheme(Scheme::ForwardEuler);
        assert_eq!(backend.scheme(), &Scheme::ForwardEuler);
    }
}
