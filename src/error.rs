//! Error types for the simulation pipeline
//!
//! Errors fall into four groups:
//!
//! - [`InitError`] - startup failures (adapter, device, shaders). Fatal, never retried.
//! - [`FrameError`] - a frame could not be produced. Swallowed by the controller, the
//!   next frame tries again.
//! - [`ConfigError`] - a configuration value outside the allowed range. Raised at the
//!   configuration boundary; the core only ever sees validated values.
//! - [`AllocationError`] - the grid does not fit on the device. Fatal for that
//!   configuration.

use thiserror::Error;

/// Startup failures. The pipeline is unusable without these resources.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface reports no supported texture formats")]
    UnsupportedSurface,

    #[error("adapter does not support compute shaders")]
    ComputeUnsupported,

    #[error("failed to compile `{label}`: {message}")]
    ShaderCompilation { label: String, message: String },
}

/// Per-frame failures. The frame is skipped and retried on the next tick.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("surface texture unavailable: {0}")]
    SurfaceUnavailable(#[from] wgpu::SurfaceError),

    #[error("no grid buffers bound")]
    MissingGrid,
}

/// Configuration values outside the accepted range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{axis} {value} is outside {min}..={max}")]
    DimensionOutOfRange {
        axis: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("{axis} {value} is not a multiple of {step}")]
    DimensionNotAligned {
        axis: &'static str,
        value: u32,
        step: u32,
    },

    #[error("workgroup size {0} is not one of 4, 8, 16")]
    InvalidWorkgroupSize(u32),

    #[error("timesteps per second {value} is outside {min}..={max}")]
    TimestepOutOfRange { value: u32, min: u32, max: u32 },
}

/// Grid buffers could not be allocated for the requested dimensions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("grid needs {requested} bytes per buffer, device limit is {limit}")]
    TooLarge { requested: u64, limit: u64 },

    #[error("device out of memory allocating {requested} bytes: {message}")]
    OutOfMemory { requested: u64, message: String },
}

/// Top-level error for everything that can escape the controller.
#[derive(Debug, Error)]
pub enum LifeError {
    #[error(transparent)]
    Init(#[from] InitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("buffer readback failed: {0}")]
    Readback(String),

    #[error("device still has {in_flight} submissions in flight after waiting")]
    DeviceStalled { in_flight: u64 },
}

pub type Result<T, E = LifeError> = std::result::Result<T, E>;
