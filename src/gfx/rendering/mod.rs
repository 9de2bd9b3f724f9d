// src/gfx/rendering/mod.rs
//! Cell rendering
//!
//! Handles the render pipeline and the shared quad geometry.

pub mod cell_renderer;
pub mod quad;

pub use cell_renderer::{RenderStage, BACKGROUND};
pub use quad::QuadGeometry;
