//! Pointer input.
//!
//! The public API does not expose winit types; the runtime translates window
//! events into `PointerEvent`s in normalized space (origin bottom-left).

mod pointer;
mod types;

pub use pointer::{
    velocity_attenuation, PointerState, ATTENUATION_REFERENCE_SIZE, PRESSED_DAMPING,
    RELEASED_DAMPING,
};
pub use types::{normalize_position, PointerEvent};
