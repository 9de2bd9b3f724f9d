// src/wgpu_utils/validation.rs
//! Turns wgpu validation errors into `Result`s
//!
//! wgpu reports shader and pipeline errors through the device's error handler instead of
//! return values. Wrapping creation in an error scope surfaces them to the caller.

use crate::error::InitError;

/// Runs `build` inside a validation error scope.
pub fn validated<T>(
    device: &wgpu::Device,
    label: &str,
    build: impl FnOnce() -> T,
) -> Result<T, InitError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(InitError::ShaderCompilation {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(value),
    }
}
