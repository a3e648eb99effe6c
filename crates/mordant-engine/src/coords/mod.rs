//! Coordinate types shared by input, simulations and the scheduler.
//!
//! Two spaces are in use:
//! - normalized pointer space: [0,1] on both axes, origin bottom-left, +Y up
//! - physical pixels: viewport and texture sizes

mod vec2;
mod viewport;

pub use vec2::Vec2;
pub use viewport::Viewport;
