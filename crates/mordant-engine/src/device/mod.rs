//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain), clamped to device limits
//! - acquiring frames and providing encoders/views for rendering
//! - reporting device loss to the runtime

mod class;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use class::DeviceClass;
pub use error::{log_uncaptured_errors, DeviceLoss, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
