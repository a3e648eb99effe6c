//! Render passes.
//!
//! The only pass is the composite: it samples the simulation fields and draws
//! a full-screen triangle into the frame's color target.

pub mod composite;
mod ctx;
mod vertex;

pub use composite::{CompositePass, CLEAR_COLOR};
pub use ctx::{RenderCtx, RenderTarget};
