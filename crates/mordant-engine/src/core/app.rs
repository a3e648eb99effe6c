use anyhow::Result;

use crate::coords::Viewport;
use crate::device::Gpu;
use crate::input::PointerEvent;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the runtime.
pub trait App {
    /// Called whenever a fresh GPU context exists: at startup and after a
    /// device loss was recovered.
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()>;

    /// Called with the applied (clamped) drawable size after every resize.
    fn resize(&mut self, gpu: &Gpu<'_>, size: Viewport) -> Result<()>;

    fn pointer(&mut self, event: PointerEvent) {
        let _ = event;
    }

    /// Called once per redraw.
    fn frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// The GPU context is going away; drop every resource created on it.
    fn suspend(&mut self) {}
}
