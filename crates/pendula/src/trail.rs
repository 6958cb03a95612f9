//! Fading trail image of the cropped pendulums.
//!
//! Every frame the previous image is scaled by `decay` into the back
//! buffer, each sampled pendulum paints a filled disc at its second bob,
//! and the buffers swap. Discs overwrite what is underneath.

use nalgebra::Vector2;
use pendula_dynamics::bob_positions;
use pendula_model::{Grid, PhysicalParameters};
use tracing::debug;

pub const DEFAULT_DECAY: f32 = 0.996;
pub const DEFAULT_VIEW_SCALE: f64 = 0.4;
/// Disc radius in normalised device units.
pub const DEFAULT_MARKER_RADIUS: f64 = 0.005;

pub type Rgba = [f32; 4];

/// Row-major RGBA image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl TrailBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| *p == [0.0; 4])
    }

    /// Number of pixels with any non-zero channel.
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| **p != [0.0; 4]).count()
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    /// `self = factor · source`. Both buffers have the same size.
    fn scaled_from(&mut self, source: &TrailBuffer, factor: f32) {
        for (dst, src) in self.pixels.iter_mut().zip(&source.pixels) {
            *dst = src.map(|c| c * factor);
        }
    }

    /// Fill the disc centred at pixel coordinates `(cx, cy)`.
    fn fill_disc(&mut self, cx: f64, cy: f64, radius: f64, color: Rgba) {
        let r2 = radius * radius;
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil() as i64).min(self.width as i64 - 1);
        let y1 = ((cy + radius).ceil() as i64).min(self.height as i64 - 1);
        if x1 < 0 || y1 < 0 {
            return;
        }
        for y in y0..=y1 as usize {
            let dy = y as f64 + 0.5 - cy;
            for x in x0..=x1 as usize {
                let dx = x as f64 + 0.5 - cx;
                if dx * dx + dy * dy <= r2 {
                    self.pixels[y * self.width + x] = color;
                }
            }
        }
    }
}

/// How markers are placed and how fast they fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailStyle {
    /// Per-frame multiplier on the previous image.
    pub decay: f32,
    /// World units to normalised device coordinates.
    pub view_scale: f64,
    pub marker_radius: f64,
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
            view_scale: DEFAULT_VIEW_SCALE,
            marker_radius: DEFAULT_MARKER_RADIUS,
        }
    }
}

/// A disc to paint: position in world units and colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Vector2<f64>,
    pub color: Rgba,
}

/// Colour of cell `(row, col)` in a `width × height` sub-grid.
pub fn cell_color(row: usize, col: usize, width: usize, height: usize) -> Rgba {
    let u = (col as f32 + 0.5) / width as f32;
    let v = (row as f32 + 0.5) / height as f32;
    [u, v, 1.0 - 0.5 * (u + v), 1.0]
}

/// One marker per finite cell, placed at its second bob.
pub fn markers(sub_grid: &Grid, params: &PhysicalParameters) -> Vec<Marker> {
    let (w, h) = (sub_grid.width(), sub_grid.height());
    let mut out = Vec::with_capacity(sub_grid.len());
    for (row, cells) in sub_grid.rows().enumerate() {
        for (col, state) in cells.iter().enumerate() {
            if !state.is_finite() {
                continue;
            }
            out.push(Marker {
                position: bob_positions(state, params).second,
                color: cell_color(row, col, w, h),
            });
        }
    }
    out
}

/// Double-buffered trail image with exponential fade.
#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    front: TrailBuffer,
    back: TrailBuffer,
    style: TrailStyle,
}

impl TrajectoryAccumulator {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_style(width, height, TrailStyle::default())
    }

    pub fn with_style(width: usize, height: usize, style: TrailStyle) -> Self {
        Self {
            front: TrailBuffer::new(width, height),
            back: TrailBuffer::new(width, height),
            style,
        }
    }

    pub fn style(&self) -> &TrailStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: TrailStyle) {
        self.style = style;
    }

    /// The latest completed image.
    pub fn trail(&self) -> &TrailBuffer {
        &self.front
    }

    pub fn clear(&mut self) {
        self.front.clear();
        self.back.clear();
        debug!("trail: cleared");
    }

    /// Reallocate at a new size. The image starts blank.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.front = TrailBuffer::new(width, height);
        self.back = TrailBuffer::new(width, height);
    }

    /// Fade, paint the sub-grid's second bobs, swap.
    pub fn advance(&mut self, sub_grid: &Grid, params: &PhysicalParameters) {
        let markers = markers(sub_grid, params);
        self.advance_with(&markers);
    }

    /// Fade, paint `markers`, swap.
    pub fn advance_with(&mut self, markers: &[Marker]) {
        self.back.scaled_from(&self.front, self.style.decay);
        let radius = self.radius_pixels();
        for marker in markers {
            let (x, y) = self.to_pixels(&marker.position);
            self.back.fill_disc(x, y, radius, marker.color);
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// World position to continuous pixel coordinates, `y` flipped.
    fn to_pixels(&self, position: &Vector2<f64>) -> (f64, f64) {
        let ndc = position * self.style.view_scale;
        let x = (ndc.x * 0.5 + 0.5) * self.front.width as f64;
        let y = (0.5 - ndc.y * 0.5) * self.front.height as f64;
        (x, y)
    }

    fn radius_pixels(&self) -> f64 {
        (self.style.marker_radius * self.front.width as f64 / 2.0).max(1.0)
    }
}
