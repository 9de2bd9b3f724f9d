//! # Graphics Module
//!
//! Device setup, the instanced cell renderer, and the imgui overlay.
//!
//! - **Context** ([`context`]) - adapter, device, queue and the frame target
//! - **Rendering** ([`rendering`]) - one quad per cell, sourced from a cell buffer
//! - **UI** ([`ui`]) - control panel drawn on top of the cells

pub mod context;
pub mod rendering;
pub mod ui;

// Re-export commonly used types
pub use context::{FrameTarget, GpuContext};
pub use rendering::cell_renderer::RenderStage;
