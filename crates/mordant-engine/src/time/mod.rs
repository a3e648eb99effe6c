//! Frame timing.
//!
//! One `FrameClock` per render loop; call `tick()` once per animation frame to
//! obtain the `FrameTime` snapshot every pass of that frame reads.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime, TARGET_FRAME_DURATION};
