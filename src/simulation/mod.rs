//! Simulation core
//!
//! Configuration, the double-buffered grid, the compute stage, and the controller that
//! decides when each generation runs.

pub mod compute;
pub mod config;
pub mod controller;
pub mod grid;
pub mod patterns;
pub mod pipeline;
pub mod timing;
