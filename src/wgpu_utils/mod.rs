// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! Small wrappers for the buffer and bind-group boilerplate shared by the compute and
//! render stages.

pub mod binding_types;
pub mod buffers;
pub mod validation;

// Re-export main types
pub use binding_types::*;
pub use buffers::{read_buffer, CellBuffer, UniformBuffer};
pub use validation::validated;
