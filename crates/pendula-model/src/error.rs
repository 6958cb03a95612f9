//! Error types shared by the pendula crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid grid dimensions {width}x{height}: both must be positive")]
    InvalidGrid { width: i64, height: i64 },

    #[error("grid of {cells} cells needs {bytes} bytes, device allows {limit}")]
    GridTooLarge { cells: usize, bytes: u64, limit: u64 },

    #[error("invalid crop size {width}x{height}: both must be positive")]
    InvalidCrop { width: i64, height: i64 },

    #[error("crop {crop_width}x{crop_height} does not fit in a {grid_width}x{grid_height} grid")]
    CropTooLarge {
        crop_width: usize,
        crop_height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    #[error("steps per frame must be non-negative, got {0}")]
    NegativeStepCount(i32),

    #[error("unknown parameter code: {0}")]
    UnknownParam(i32),

    #[error("parameter {code} expects a {expected} value, got {got}")]
    ParamType {
        code: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("no GPU adapter available")]
    NoAdapter,

    #[error("GPU device request failed: {0}")]
    Device(String),

    #[error("GPU buffer mapping failed: {0}")]
    BufferMap(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
