//! GPU ensemble integrator.
//!
//! Each scheme is encoded as a chain of `derivative` and `euler`
//! dispatches (plus `rk4_combine` for RK4) into one command buffer, so a
//! step is a single queue submission.

use crate::context::GpuContext;
use crate::gpu_state::{GpuState, Slot};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use pendula_dynamics::Scheme;
use pendula_model::{AngleWindow, Grid, PhysicalParameters, Result, grid_dims};
use std::sync::Arc;
use tracing::debug;
use wgpu::util::DeviceExt;

/// Uniform block shared by every kernel.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    _pad0: [u32; 2],
    mass1: f32,
    mass2: f32,
    length1: f32,
    length2: f32,
    gravity: f32,
    dt: f32,
    _pad1: [f32; 2],
    weights: [f32; 4],
    angles: [f32; 4],
}

impl KernelParams {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as u32,
            height: height as u32,
            weights: [1.0; 4],
            ..Self::zeroed()
        }
    }

    fn with_physics(mut self, params: &PhysicalParameters) -> Self {
        self.mass1 = params.mass1 as f32;
        self.mass2 = params.mass2 as f32;
        self.length1 = params.length1 as f32;
        self.length2 = params.length2 as f32;
        self.gravity = params.gravity as f32;
        self
    }

    fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt as f32;
        self
    }

    fn with_weights(mut self, weights: [f64; 4]) -> Self {
        self.weights = weights.map(|w| w as f32);
        self
    }

    fn with_window(mut self, window: &AngleWindow) -> Self {
        self.angles = window.radians().map(|a| a as f32);
        self
    }
}

/// A compute pipeline and the layout its bind groups are built against.
struct Kernel {
    label: &'static str,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl Kernel {
    /// Layout: uniform at 0, `inputs` read-only arrays, then one output.
    fn new(device: &wgpu::Device, label: &'static str, body: &str, inputs: u32) -> Self {
        let mut entries = vec![bgl_uniform(0)];
        entries.extend((1..=inputs).map(bgl_storage_ro));
        entries.push(bgl_storage_rw(inputs + 1));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });
        let source = format!("{}{}", shaders::PRELUDE, body);
        let pipeline = create_pipeline(device, label, &source, &layout);
        Self {
            label,
            pipeline,
            layout,
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader_src: &str,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(
            &device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label}_layout")),
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            }),
        ),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

fn bgl_uniform(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bgl_storage_ro(binding: u32) -> wgpu::BindGroupLayoutEntry {
    bgl_storage(binding, true)
}

fn bgl_storage_rw(binding: u32) -> wgpu::BindGroupLayoutEntry {
    bgl_storage(binding, false)
}

fn bgl_storage(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Steps a `width × height` ensemble on the GPU in single precision.
pub struct GpuIntegrator {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    state: GpuState,
    scheme: Scheme,
    seed: Kernel,
    derivative: Kernel,
    euler: Kernel,
    rk4_combine: Kernel,
}

impl GpuIntegrator {
    /// Compile kernels, allocate buffers and seed the grid.
    pub fn new(
        context: &GpuContext,
        width: i32,
        height: i32,
        window: &AngleWindow,
        scheme: Scheme,
    ) -> Result<Self> {
        let (w, h) = grid_dims(width, height)?;
        let device = context.device.clone();
        let queue = context.queue.clone();

        let seed = Kernel::new(&device, "seed", shaders::SEED, 0);
        let derivative = Kernel::new(&device, "derivative", shaders::DERIVATIVE, 1);
        let euler = Kernel::new(&device, "euler", shaders::EULER, 2);
        let rk4_combine = Kernel::new(&device, "rk4_combine", shaders::RK4_COMBINE, 5);

        let state = GpuState::new(device.clone(), queue.clone(), w, h)?;
        let integrator = Self {
            device,
            queue,
            state,
            scheme,
            seed,
            derivative,
            euler,
            rk4_combine,
        };
        integrator.seed_grid(window);
        Ok(integrator)
    }

    pub fn width(&self) -> usize {
        self.state.width()
    }

    pub fn height(&self) -> usize {
        self.state.height()
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    /// Resize if needed and reseed from `window`.
    ///
    /// On error the previous grid is left in place.
    pub fn init_config(&mut self, width: i32, height: i32, window: &AngleWindow) -> Result<()> {
        let (w, h) = grid_dims(width, height)?;
        if (w, h) != (self.state.width(), self.state.height()) {
            self.state = GpuState::new(self.device.clone(), self.queue.clone(), w, h)?;
        }
        debug!(width = w, height = h, ?window, "gpu: init_config");
        self.seed_grid(window);
        Ok(())
    }

    fn seed_grid(&self, window: &AngleWindow) {
        let params = KernelParams::new(self.width(), self.height()).with_window(window);
        let mut encoder = self.encoder("seed_encoder");
        self.dispatch(&mut encoder, &self.seed, &params, &[], self.state.current());
        self.queue.submit(Some(encoder.finish()));
    }

    /// Advance every cell by `dt` with the configured scheme.
    pub fn step(&mut self, params: &PhysicalParameters, dt: f64) {
        let base = KernelParams::new(self.width(), self.height()).with_physics(params);
        let src = self.state.current();
        let mut encoder = self.encoder("step_encoder");

        let dst = match &self.scheme {
            Scheme::Rk4 => self.encode_rk4(&mut encoder, &base, dt, src),
            Scheme::ForwardEuler => {
                let dst = src.flipped();
                self.encode_euler(&mut encoder, base.with_dt(dt), src, Slot::K1, dst);
                dst
            }
            Scheme::Splitting(splitting) => {
                let mut from = src;
                for sub in splitting.steps() {
                    let to = from.flipped();
                    let params = base.with_dt(dt).with_weights(sub.mask());
                    self.encode_euler(&mut encoder, params, from, Slot::K1, to);
                    from = to;
                }
                from
            }
        };

        self.queue.submit(Some(encoder.finish()));
        self.state.commit(dst);
    }

    /// `slope ← f(from)` then `to ← from + dt·w⊙slope`.
    fn encode_euler(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: KernelParams,
        from: Slot,
        slope: Slot,
        to: Slot,
    ) {
        self.dispatch(encoder, &self.derivative, &params, &[from], slope);
        self.dispatch(encoder, &self.euler, &params, &[from, slope], to);
    }

    fn encode_rk4(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        base: &KernelParams,
        dt: f64,
        src: Slot,
    ) -> Slot {
        let half = base.with_dt(dt / 2.0);
        let full = base.with_dt(dt);
        let d = &self.derivative;
        let e = &self.euler;

        self.dispatch(encoder, d, base, &[src], Slot::K1);
        self.dispatch(encoder, e, &half, &[src, Slot::K1], Slot::Stage);
        self.dispatch(encoder, d, base, &[Slot::Stage], Slot::K2);
        self.dispatch(encoder, e, &half, &[src, Slot::K2], Slot::Stage);
        self.dispatch(encoder, d, base, &[Slot::Stage], Slot::K3);
        self.dispatch(encoder, e, &full, &[src, Slot::K3], Slot::Stage);
        self.dispatch(encoder, d, base, &[Slot::Stage], Slot::K4);

        let dst = src.flipped();
        self.dispatch(
            encoder,
            &self.rk4_combine,
            &full,
            &[src, Slot::K1, Slot::K2, Slot::K3, Slot::K4],
            dst,
        );
        dst
    }

    /// Encode one kernel over every cell in its own compute pass.
    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: &Kernel,
        params: &KernelParams,
        inputs: &[Slot],
        output: Slot,
    ) {
        let params_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("kernel_params"),
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buf.as_entire_binding(),
        }];
        for (i, slot) in inputs.iter().chain(std::iter::once(&output)).enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: self.state.buffer(*slot).as_entire_binding(),
            });
        }

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label),
            layout: &kernel.layout,
            entries: &entries,
        });

        let (x, y) = self.state.workgroups();
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(&kernel.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Blocking read-back of the current grid.
    pub fn read(&self) -> Result<Grid> {
        let data = pollster::block_on(self.state.download())?;
        Ok(Grid::from_flat(self.width(), self.height(), &data))
    }

    /// Replace the device grid with a host grid of the same shape.
    pub fn upload(&mut self, grid: &Grid) -> Result<()> {
        self.state.upload(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_params_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 80);
    }

    #[test]
    fn test_kernel_params_builders() {
        let p = KernelParams::new(3, 2)
            .with_dt(0.5)
            .with_weights([0.0, 0.0, 2.0, 2.0]);
        assert_eq!((p.width, p.height), (3, 2));
        assert_eq!(p.dt, 0.5);
        assert_eq!(p.weights, [0.0, 0.0, 2.0, 2.0]);
        assert_eq!(KernelParams::new(1, 1).weights, [1.0; 4]);
    }
}
