//! Mordant engine crate.
//!
//! A pointer-driven paint simulation feeding a reaction-diffusion simulation,
//! composited into a window every frame. This crate owns the platform + GPU
//! runtime, the simulations and the scheduler that sequences them.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod shader;
pub mod sim;
pub mod render;
