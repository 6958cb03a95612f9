//! Physical parameters and the host-facing parameter set.
//!
//! `SimParams` mirrors the fields a UI can edit. Each field has a stable
//! integer [`ParamCode`] so that a scripting host can get/set values
//! without knowing the struct layout.

use crate::error::{Error, Result};
use crate::state::AngleWindow;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Standard gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.81;

/// Masses, lengths and gravity shared by every cell during a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParameters {
    pub mass1: f64,
    pub mass2: f64,
    pub length1: f64,
    pub length2: f64,
    pub gravity: f64,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self {
            mass1: 1.0,
            mass2: 1.0,
            length1: 1.0,
            length2: 1.0,
            gravity: GRAVITY,
        }
    }
}

/// How a change to a parameter propagates into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Step size or step count: takes effect on the next step.
    Cadence,
    /// Crop origin: the trail is cleared, state is kept.
    View,
    /// Everything else: the grid is reallocated and reseeded.
    Configuration,
}

/// Stable codes for each field of [`SimParams`].
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamCode {
    UseGpu = 0,
    StepsPerFrame = 1,
    Dt = 2,
    Mass1 = 3,
    Length1 = 4,
    Mass2 = 5,
    Length2 = 6,
    Gravity = 7,
    CropOrigin = 8,
    MinPhi1 = 9,
    MaxPhi1 = 10,
    MinPhi2 = 11,
    MaxPhi2 = 12,
    GridWidth = 13,
    GridHeight = 14,
    SubGridWidth = 15,
    SubGridHeight = 16,
}

impl ParamCode {
    pub const ALL: [ParamCode; 17] = [
        ParamCode::UseGpu,
        ParamCode::StepsPerFrame,
        ParamCode::Dt,
        ParamCode::Mass1,
        ParamCode::Length1,
        ParamCode::Mass2,
        ParamCode::Length2,
        ParamCode::Gravity,
        ParamCode::CropOrigin,
        ParamCode::MinPhi1,
        ParamCode::MaxPhi1,
        ParamCode::MinPhi2,
        ParamCode::MaxPhi2,
        ParamCode::GridWidth,
        ParamCode::GridHeight,
        ParamCode::SubGridWidth,
        ParamCode::SubGridHeight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamCode::UseGpu => "use_gpu",
            ParamCode::StepsPerFrame => "steps_per_frame",
            ParamCode::Dt => "dt",
            ParamCode::Mass1 => "mass1",
            ParamCode::Length1 => "length1",
            ParamCode::Mass2 => "mass2",
            ParamCode::Length2 => "length2",
            ParamCode::Gravity => "gravity",
            ParamCode::CropOrigin => "crop_origin",
            ParamCode::MinPhi1 => "min_phi1",
            ParamCode::MaxPhi1 => "max_phi1",
            ParamCode::MinPhi2 => "min_phi2",
            ParamCode::MaxPhi2 => "max_phi2",
            ParamCode::GridWidth => "grid_width",
            ParamCode::GridHeight => "grid_height",
            ParamCode::SubGridWidth => "sub_grid_width",
            ParamCode::SubGridHeight => "sub_grid_height",
        }
    }

    pub fn kind(self) -> ParamKind {
        match self {
            ParamCode::Dt | ParamCode::StepsPerFrame => ParamKind::Cadence,
            ParamCode::CropOrigin => ParamKind::View,
            _ => ParamKind::Configuration,
        }
    }
}

impl TryFrom<i32> for ParamCode {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        ParamCode::ALL
            .iter()
            .copied()
            .find(|c| *c as i32 == code)
            .ok_or(Error::UnknownParam(code))
    }
}

/// A tagged parameter value as exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    Vec2([f64; 2]),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Vec2(_) => "vec2",
        }
    }
}

/// Full parameter set of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub use_gpu: bool,
    pub steps_per_frame: i32,
    pub dt: f64,
    pub mass1: f64,
    pub length1: f64,
    pub mass2: f64,
    pub length2: f64,
    pub gravity: f64,
    /// Normalised `(x, y)` origin of the magnified sub-grid.
    pub crop_origin: [f64; 2],
    pub min_phi1: f64,
    pub max_phi1: f64,
    pub min_phi2: f64,
    pub max_phi2: f64,
    pub grid_width: i32,
    pub grid_height: i32,
    pub sub_grid_width: i32,
    pub sub_grid_height: i32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            use_gpu: true,
            steps_per_frame: 10,
            dt: 0.001,
            mass1: 1.0,
            length1: 1.0,
            mass2: 1.0,
            length2: 1.0,
            gravity: GRAVITY,
            crop_origin: [0.5, 0.5],
            min_phi1: -1.0,
            max_phi1: 1.0,
            min_phi2: -1.0,
            max_phi2: 1.0,
            grid_width: 128,
            grid_height: 128,
            sub_grid_width: 1,
            sub_grid_height: 1,
        }
    }
}

impl SimParams {
    /// Load parameters from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn physical(&self) -> PhysicalParameters {
        PhysicalParameters {
            mass1: self.mass1,
            mass2: self.mass2,
            length1: self.length1,
            length2: self.length2,
            gravity: self.gravity,
        }
    }

    pub fn angle_window(&self) -> AngleWindow {
        AngleWindow {
            min_phi1: self.min_phi1,
            max_phi1: self.max_phi1,
            min_phi2: self.min_phi2,
            max_phi2: self.max_phi2,
        }
    }

    pub fn get(&self, code: ParamCode) -> ParamValue {
        match code {
            ParamCode::UseGpu => ParamValue::Bool(self.use_gpu),
            ParamCode::StepsPerFrame => ParamValue::Int(self.steps_per_frame),
            ParamCode::Dt => ParamValue::Float(self.dt),
            ParamCode::Mass1 => ParamValue::Float(self.mass1),
            ParamCode::Length1 => ParamValue::Float(self.length1),
            ParamCode::Mass2 => ParamValue::Float(self.mass2),
            ParamCode::Length2 => ParamValue::Float(self.length2),
            ParamCode::Gravity => ParamValue::Float(self.gravity),
            ParamCode::CropOrigin => ParamValue::Vec2(self.crop_origin),
            ParamCode::MinPhi1 => ParamValue::Float(self.min_phi1),
            ParamCode::MaxPhi1 => ParamValue::Float(self.max_phi1),
            ParamCode::MinPhi2 => ParamValue::Float(self.min_phi2),
            ParamCode::MaxPhi2 => ParamValue::Float(self.max_phi2),
            ParamCode::GridWidth => ParamValue::Int(self.grid_width),
            ParamCode::GridHeight => ParamValue::Int(self.grid_height),
            ParamCode::SubGridWidth => ParamValue::Int(self.sub_grid_width),
            ParamCode::SubGridHeight => ParamValue::Int(self.sub_grid_height),
        }
    }

    /// Assign one field. The value's type must match the field's type.
    ///
    /// This only validates types; range checks happen when the
    /// simulation applies the new configuration.
    pub fn set(&mut self, code: ParamCode, value: ParamValue) -> Result<()> {
        let mismatch = Error::ParamType {
            code: code.name(),
            expected: self.get(code).type_name(),
            got: value.type_name(),
        };
        match value {
            ParamValue::Bool(b) if code == ParamCode::UseGpu => self.use_gpu = b,
            ParamValue::Vec2(v) if code == ParamCode::CropOrigin => self.crop_origin = v,
            ParamValue::Int(i) => *self.int_field(code).ok_or(mismatch)? = i,
            ParamValue::Float(f) => *self.float_field(code).ok_or(mismatch)? = f,
            _ => return Err(mismatch),
        }
        Ok(())
    }

    /// Set one component of a vector parameter, as the scripting bridge does.
    pub fn set_component(&mut self, code: ParamCode, index: usize, value: f64) -> Result<()> {
        match self.get(code) {
            ParamValue::Vec2(mut v) if index < 2 => {
                v[index] = value;
                self.set(code, ParamValue::Vec2(v))
            }
            other => Err(Error::ParamType {
                code: code.name(),
                expected: "vec2",
                got: other.type_name(),
            }),
        }
    }

    fn int_field(&mut self, code: ParamCode) -> Option<&mut i32> {
        let field = match code {
            ParamCode::StepsPerFrame => &mut self.steps_per_frame,
            ParamCode::GridWidth => &mut self.grid_width,
            ParamCode::GridHeight => &mut self.grid_height,
            ParamCode::SubGridWidth => &mut self.sub_grid_width,
            ParamCode::SubGridHeight => &mut self.sub_grid_height,
            _ => return None,
        };
        Some(field)
    }

    fn float_field(&mut self, code: ParamCode) -> Option<&mut f64> {
        let field = match code {
            ParamCode::Dt => &mut self.dt,
            ParamCode::Mass1 => &mut self.mass1,
            ParamCode::Length1 => &mut self.length1,
            ParamCode::Mass2 => &mut self.mass2,
            ParamCode::Length2 => &mut self.length2,
            ParamCode::Gravity => &mut self.gravity,
            ParamCode::MinPhi1 => &mut self.min_phi1,
            ParamCode::MaxPhi1 => &mut self.max_phi1,
            ParamCode::MinPhi2 => &mut self.min_phi2,
            ParamCode::MaxPhi2 => &mut self.max_phi2,
            _ => return None,
        };
        Some(field)
    }
}
