//! Frame scheduler: owns the simulations and the composite pass and decides
//! when they are built, resized and recorded.
//!
//! Per frame: tick timing, record one compute pass (paint, then
//! reaction-diffusion), record the composite render pass into the acquired
//! surface view, submit once, then do pointer bookkeeping.

use anyhow::Result;

use crate::coords::Viewport;
use crate::device::{DeviceClass, Gpu};
use crate::input::{PointerEvent, PointerState};
use crate::render::{CompositePass, RenderCtx, RenderTarget};
use crate::sim::field::validate_size;
use crate::sim::{PaintSimulation, ReactionDiffusion, ReactionParams, SimConfig};
use crate::time::FrameClock;

use super::app::{App, AppControl};
use super::ctx::{FrameCtx, FrameOutcome};

/// Used when the first known viewport is degenerate (minimized window).
const FALLBACK_VIEWPORT: Viewport = Viewport::new(100, 100);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SchedulerState {
    /// No GPU resources; frames are ignored.
    Idle,
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Overrides the class derived from the adapter.
    pub device_class: Option<DeviceClass>,
    pub reaction: ReactionParams,
}

struct Passes {
    paint: PaintSimulation,
    reaction: ReactionDiffusion,
    composite: CompositePass,
}

pub struct FrameScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    sim: SimConfig,
    clock: FrameClock,
    pointer: PointerState,
    viewport: Viewport,
    passes: Option<Passes>,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            sim: SimConfig::default(),
            clock: FrameClock::new(),
            pointer: PointerState::new(),
            viewport: Viewport::default(),
            passes: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn sim_config(&self) -> SimConfig {
        self.sim
    }

    /// Viewport the current fields were derived from.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pointer_state(&self) -> &PointerState {
        &self.pointer
    }

    pub fn paint(&self) -> Option<&PaintSimulation> {
        self.passes.as_ref().map(|p| &p.paint)
    }

    pub fn reaction(&self) -> Option<&ReactionDiffusion> {
        self.passes.as_ref().map(|p| &p.reaction)
    }

    /// Builds every component for `ctx.viewport` and starts the scheduler.
    pub fn start(&mut self, ctx: &RenderCtx<'_>, class: DeviceClass) -> Result<()> {
        let class = self.config.device_class.unwrap_or(class);
        self.sim = SimConfig::for_class(class);

        let viewport = ctx.viewport.clamped(ctx.device.limits().max_texture_dimension_2d);
        let resolutions = match self.sim.resolutions(viewport) {
            Some(r) => r,
            None => self
                .sim
                .resolutions(FALLBACK_VIEWPORT)
                .ok_or_else(|| anyhow::anyhow!("fallback viewport is degenerate"))?,
        };

        let paint = PaintSimulation::new(ctx.device, resolutions.paint)?;
        let reaction = ReactionDiffusion::new(
            ctx.device,
            ctx.queue,
            resolutions.reaction,
            self.sim.reaction_iterations,
            self.config.reaction,
            &paint,
        )?;
        let composite = CompositePass::new(ctx, &paint, &reaction)?;

        log::info!(
            "scheduler running ({class:?}): paint {}x{}, reaction-diffusion {}x{} x{}",
            resolutions.paint.width,
            resolutions.paint.height,
            resolutions.reaction.width,
            resolutions.reaction.height,
            self.sim.reaction_iterations
        );

        self.passes = Some(Passes {
            paint,
            reaction,
            composite,
        });
        self.viewport = resolutions.viewport;
        self.clock.reset();
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// Drops all GPU resources and returns to `Idle`.
    pub fn stop(&mut self) {
        if self.passes.take().is_some() {
            log::info!("scheduler idle");
        }
        self.state = SchedulerState::Idle;
    }

    /// Resizes paint, then reaction-diffusion, then the composite bindings.
    ///
    /// Returns `Ok(false)` when nothing changed: a degenerate size or an idle
    /// scheduler. Sizes the device cannot allocate are rejected before any
    /// field is released.
    pub fn resize_viewport(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        requested: Viewport,
    ) -> Result<bool> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let viewport = requested.clamped(max_dimension);

        let Some(resolutions) = self.sim.resolutions(viewport) else {
            log::debug!("ignoring degenerate resize to {}x{}", viewport.width, viewport.height);
            return Ok(false);
        };
        let Some(passes) = self.passes.as_mut() else {
            return Ok(false);
        };

        validate_size(resolutions.paint, max_dimension)?;
        validate_size(resolutions.reaction, max_dimension)?;

        // A failed stage leaves its fields at their previous size; every
        // binding is rebuilt from whatever fields exist afterwards.
        let resized = passes.paint.init(device, resolutions.paint).and_then(|()| {
            passes
                .reaction
                .init(device, queue, resolutions.reaction, &passes.paint)
        });
        if resized.is_err() {
            passes.reaction.rebind(device, &passes.paint);
        }

        let applied = if passes.paint.size() == resolutions.paint {
            viewport
        } else {
            self.viewport
        };
        passes
            .composite
            .set_size(device, applied, &passes.paint, &passes.reaction);
        self.viewport = applied;
        resized?;

        log::debug!("resized to {}x{}", viewport.width, viewport.height);
        Ok(true)
    }

    /// Advances timing and records this frame's compute pass and composite
    /// pass into `target`.
    ///
    /// Call only once the surface frame was acquired. Returns `false` without
    /// recording anything, or advancing the clock, while idle.
    pub fn record_frame(&mut self, queue: &wgpu::Queue, target: RenderTarget<'_>) -> bool {
        let Some(passes) = self.passes.as_mut() else {
            return false;
        };
        let time = self.clock.tick();

        {
            let mut cpass = target.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mordant simulation pass"),
                timestamp_writes: None,
            });
            passes
                .paint
                .compute(queue, &mut cpass, &time, &mut self.pointer, self.viewport);
            passes.reaction.compute(&mut cpass, &passes.paint);
        }

        passes.composite.encode(target, &passes.paint, &passes.reaction);
        true
    }

    /// Frames recorded since the scheduler was created.
    pub fn frames_recorded(&self) -> u64 {
        self.clock.frame_index()
    }

    /// Bookkeeping after the frame was submitted.
    pub fn end_frame(&mut self) {
        self.pointer.end_frame();
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl App for FrameScheduler {
    fn init(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        log::debug!(
            "timestamp queries {}",
            if gpu.supports_timestamp_queries() { "available" } else { "unavailable" }
        );
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), gpu.size());
        self.start(&ctx, gpu.device_class())
    }

    fn resize(&mut self, gpu: &Gpu<'_>, size: Viewport) -> Result<()> {
        self.resize_viewport(gpu.device(), gpu.queue(), size).map(|_| ())
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.pointer.apply_event(event);
    }

    fn frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.state == SchedulerState::Idle {
            return AppControl::Continue;
        }

        // Runs only once a surface texture was acquired.
        let outcome = ctx.render(|rctx, target| {
            self.record_frame(rctx.queue, target);
        });

        match outcome {
            FrameOutcome::Presented => {
                self.end_frame();
                AppControl::Continue
            }
            FrameOutcome::Skipped => AppControl::Continue,
            FrameOutcome::Fatal => AppControl::Exit,
        }
    }

    fn suspend(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::device::testing::{headless_or_skip, HeadlessGpu};

    const VIEWPORT: Viewport = Viewport::new(800, 600);
    const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn started(gpu: &HeadlessGpu, class: DeviceClass) -> FrameScheduler {
        let mut scheduler = FrameScheduler::default();
        let ctx = RenderCtx::new(&gpu.device, &gpu.queue, TARGET_FORMAT, VIEWPORT);
        scheduler.start(&ctx, class).expect("scheduler starts");
        scheduler
    }

    fn render_frame(gpu: &HeadlessGpu, scheduler: &mut FrameScheduler) {
        let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: scheduler.viewport().extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        assert!(scheduler.record_frame(&gpu.queue, RenderTarget::new(&mut encoder, &view)));
        gpu.queue.submit(std::iter::once(encoder.finish()));
        scheduler.end_frame();
    }

    fn generations(scheduler: &FrameScheduler) -> (u64, u64) {
        (
            scheduler.paint().map_or(u64::MAX, PaintSimulation::generation),
            scheduler.reaction().map_or(u64::MAX, ReactionDiffusion::generation),
        )
    }

    #[test]
    fn starts_idle() {
        let scheduler = FrameScheduler::default();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(scheduler.paint().is_none());
    }

    #[test]
    fn pointer_events_reach_pointer_state() {
        let mut scheduler = FrameScheduler::default();
        App::pointer(&mut scheduler, PointerEvent::Down(Vec2::new(0.25, 0.75)));
        assert!(scheduler.pointer_state().pressed);
        assert_eq!(scheduler.pointer_state().position, Vec2::new(0.25, 0.75));
    }

    #[test]
    fn start_derives_resolutions() {
        let gpu = headless_or_skip!();
        let scheduler = started(&gpu, DeviceClass::Desktop);

        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(scheduler.paint().map(|p| p.size()), Some(Viewport::new(600, 450)));
        assert_eq!(scheduler.reaction().map(|r| r.size()), Some(Viewport::new(200, 150)));
        assert_eq!(scheduler.reaction().map(|r| r.iterations()), Some(20));
    }

    #[test]
    fn frames_alternate_paint_and_keep_reaction_parity() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Constrained);

        for frame in 1..=4 {
            render_frame(&gpu, &mut scheduler);
            assert_eq!(scheduler.paint().map(|p| p.swap_index()), Some(frame % 2));
            // 12 iterations per frame: parity unchanged.
            assert_eq!(scheduler.reaction().map(|r| r.swap_index()), Some(0));
        }
        assert_eq!(scheduler.frames_recorded(), 4);
    }

    #[test]
    fn idle_frames_do_not_advance_timing() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Desktop);
        render_frame(&gpu, &mut scheduler);
        scheduler.stop();

        let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: VIEWPORT.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());

        assert!(!scheduler.record_frame(&gpu.queue, RenderTarget::new(&mut encoder, &view)));
        assert_eq!(scheduler.frames_recorded(), 1);
    }

    #[test]
    fn minimized_start_uses_the_fallback_viewport() {
        let gpu = headless_or_skip!();
        let mut scheduler = FrameScheduler::default();
        let ctx = RenderCtx::new(&gpu.device, &gpu.queue, TARGET_FORMAT, Viewport::new(0, 0));
        scheduler.start(&ctx, DeviceClass::Desktop).expect("scheduler starts");

        assert_eq!(scheduler.viewport(), FALLBACK_VIEWPORT);
        assert_eq!(scheduler.paint().map(|p| p.size()), Some(Viewport::new(75, 75)));
        render_frame(&gpu, &mut scheduler);
    }

    #[test]
    fn degenerate_resize_is_a_no_op() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Desktop);
        let before = generations(&scheduler);

        for size in [Viewport::new(0, 0), Viewport::new(1, 600), Viewport::new(800, 1)] {
            let changed = scheduler
                .resize_viewport(&gpu.device, &gpu.queue, size)
                .expect("ignored");
            assert!(!changed);
        }

        assert_eq!(generations(&scheduler), before);
        assert_eq!(scheduler.viewport(), VIEWPORT);
        render_frame(&gpu, &mut scheduler);
    }

    #[test]
    fn repeated_resize_reallocates_each_time() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Desktop);

        for n in 1..=3 {
            assert!(scheduler
                .resize_viewport(&gpu.device, &gpu.queue, Viewport::new(640, 480))
                .expect("resize"));
            assert_eq!(generations(&scheduler), (n, n));
            assert_eq!(scheduler.paint().map(|p| p.swap_index()), Some(0));
        }

        assert_eq!(scheduler.paint().map(|p| p.size()), Some(Viewport::new(480, 360)));
        assert_eq!(scheduler.reaction().map(|r| r.size()), Some(Viewport::new(160, 120)));
        render_frame(&gpu, &mut scheduler);
    }

    #[test]
    fn oversized_resize_is_clamped() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Desktop);
        let max = gpu.device.limits().max_texture_dimension_2d;

        assert!(scheduler
            .resize_viewport(&gpu.device, &gpu.queue, Viewport::new(max + 500, 300))
            .expect("clamped resize"));
        assert_eq!(scheduler.viewport(), Viewport::new(max, 300));
    }

    #[test]
    fn stop_returns_to_idle() {
        let gpu = headless_or_skip!();
        let mut scheduler = started(&gpu, DeviceClass::Desktop);
        scheduler.stop();

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler
            .resize_viewport(&gpu.device, &gpu.queue, VIEWPORT)
            .expect("idle resize"));
    }
}
