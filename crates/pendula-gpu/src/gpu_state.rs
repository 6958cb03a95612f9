//! Device-side storage for the ensemble.
//!
//! Two state slots ping-pong between steps so no kernel binds the same
//! buffer for reading and writing. Four slope slots and one stage slot
//! hold RK4 intermediates; splitting and Euler steps only use `K1`.

use pendula_model::{Error, Grid, Result};
use std::sync::Arc;

/// Bytes per cell: `vec4<f32>`.
pub const CELL_BYTES: u64 = 16;

/// Invocations per workgroup in every kernel.
pub const WORKGROUP_SIZE: u32 = 256;

const MAX_GROUPS_PER_DIM: u32 = 65535;

/// Named buffer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    StateA,
    StateB,
    K1,
    K2,
    K3,
    K4,
    Stage,
}

impl Slot {
    const ALL: [Slot; 7] = [
        Slot::StateA,
        Slot::StateB,
        Slot::K1,
        Slot::K2,
        Slot::K3,
        Slot::K4,
        Slot::Stage,
    ];

    fn label(self) -> &'static str {
        match self {
            Slot::StateA => "state_a",
            Slot::StateB => "state_b",
            Slot::K1 => "k1",
            Slot::K2 => "k2",
            Slot::K3 => "k3",
            Slot::K4 => "k4",
            Slot::Stage => "stage",
        }
    }

    /// The other state slot.
    pub fn flipped(self) -> Slot {
        match self {
            Slot::StateA => Slot::StateB,
            _ => Slot::StateA,
        }
    }
}

/// Per-cell buffers for a `width × height` grid.
pub struct GpuState {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    width: usize,
    height: usize,
    buffers: Vec<wgpu::Buffer>,
    staging: wgpu::Buffer,
    current: Slot,
}

impl GpuState {
    /// Allocate buffers, failing if one slot exceeds the device's binding limit.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        let cells = width * height;
        let bytes = cells as u64 * CELL_BYTES;
        let limits = device.limits();
        let limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if bytes > limit {
            return Err(Error::GridTooLarge { cells, bytes, limit });
        }

        let buffers = Slot::ALL
            .iter()
            .map(|slot| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(slot.label()),
                    size: bytes,
                    usage: wgpu::BufferUsages::STORAGE
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("state_staging"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            device,
            queue,
            width,
            height,
            buffers,
            staging,
            current: Slot::StateA,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    fn byte_size(&self) -> u64 {
        self.cell_count() as u64 * CELL_BYTES
    }

    pub fn buffer(&self, slot: Slot) -> &wgpu::Buffer {
        &self.buffers[slot as usize]
    }

    /// Slot holding the latest committed state.
    pub fn current(&self) -> Slot {
        self.current
    }

    /// Mark `slot` as holding the latest state once its writes are submitted.
    pub fn commit(&mut self, slot: Slot) {
        debug_assert!(matches!(slot, Slot::StateA | Slot::StateB));
        self.current = slot;
    }

    /// Workgroup counts covering every cell, spilling into `y` past 65535.
    pub fn workgroups(&self) -> (u32, u32) {
        let groups = (self.cell_count() as u32).div_ceil(WORKGROUP_SIZE).max(1);
        let x = groups.min(MAX_GROUPS_PER_DIM);
        (x, groups.div_ceil(x))
    }

    /// Overwrite the current slot with a host grid of the same shape.
    pub fn upload(&self, grid: &Grid) -> Result<()> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(Error::InvalidGrid {
                width: grid.width() as i64,
                height: grid.height() as i64,
            });
        }
        let data = grid.to_flat();
        self.queue
            .write_buffer(self.buffer(self.current), 0, bytemuck::cast_slice(&data));
        Ok(())
    }

    /// Copy the current slot back to the host as flat `f32` quadruples.
    pub async fn download(&self) -> Result<Vec<f32>> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("download_encoder"),
            });
        encoder.copy_buffer_to_buffer(
            self.buffer(self.current),
            0,
            &self.staging,
            0,
            self.byte_size(),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.staging.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });

        self.device.poll(wgpu::Maintain::Wait);

        rx.receive()
            .await
            .ok_or_else(|| Error::BufferMap("map callback dropped".into()))?
            .map_err(|e| Error::BufferMap(format!("{e:?}")))?;

        let mapped = slice.get_mapped_range();
        let data: Vec<f32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        self.staging.unmap();

        Ok(data)
    }
}
