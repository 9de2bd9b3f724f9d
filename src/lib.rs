//! GPU Game of Life
//!
//! Conway's Game of Life stepped by a wgpu compute shader and drawn with one instanced quad
//! per cell. The cell buffers never leave the GPU: the compute pass writes one buffer of a
//! ping-pong pair and the render pass reads that same buffer as instance data.

pub mod app;
pub mod error;
pub mod gfx;
pub mod simulation;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{LifeApp, LifeOptions};
pub use error::{LifeError, Result};
pub use simulation::{
    config::{SimulationConfig, WorkgroupSize},
    controller::{ControllerState, FrameOutcome, SimulationController},
    grid::{BufferRole, GridDescriptor, InitialPopulation, SeedPolicy},
    patterns::Pattern,
    pipeline::{GpuPipeline, LifePipeline},
};
