use std::sync::Arc;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Reported by the device-lost callback.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DeviceLoss {
    /// The device was destroyed on purpose. No recovery is attempted.
    Intentional,
    /// Driver reset, resource exhaustion, etc. The whole GPU stack is rebuilt.
    Unexpected(String),
}

impl DeviceLoss {
    pub(crate) fn from_reason(reason: wgpu::DeviceLostReason, message: String) -> Self {
        match reason {
            wgpu::DeviceLostReason::Destroyed => DeviceLoss::Intentional,
            _ => DeviceLoss::Unexpected(message),
        }
    }
}

/// Sends errors raised outside any error scope to the log.
///
/// wgpu's default handler panics; scoped allocations report their own
/// failures, everything else is logged and rendering continues.
pub fn log_uncaptured_errors(device: &wgpu::Device) {
    device.on_uncaptured_error(Arc::new(|error: wgpu::Error| {
        log::error!("uncaptured GPU error: {error}");
    }));
}
