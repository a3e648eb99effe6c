//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and the frame
//! scheduler that sequences the simulations and the composite pass.

mod app;
mod ctx;
pub mod scheduler;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, FrameOutcome};
pub use scheduler::{FrameScheduler, SchedulerConfig, SchedulerState};
