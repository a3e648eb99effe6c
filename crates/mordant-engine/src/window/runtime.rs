use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::{Vec2, Viewport};
use crate::core::{App, AppControl, FrameCtx};
use crate::device::{DeviceLoss, Gpu, GpuInit};
use crate::input::{normalize_position, PointerEvent};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "mordant".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and drives `app` until the window closes.
    ///
    /// Errors that end the loop early (no usable GPU, a device that cannot be
    /// rebuilt after a loss) are returned once the event loop has exited.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

fn build_entry(window: Window, gpu_init: GpuInit) -> Result<WindowEntry> {
    WindowEntryTryBuilder {
        window,
        gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
    }
    .try_build()
}

struct AppState<A>
where
    A: App + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    /// Last pointer position; button events carry none.
    cursor: Vec2,
    failure: Option<anyhow::Error>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: App + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            cursor: Vec2::new(0.5, 0.5),
            failure: None,
            exit_requested: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = build_entry(window, self.gpu_init.clone())
            .context("GPU initialization failed")?;
        entry
            .with_gpu(|gpu| self.app.init(gpu))
            .context("failed to build simulations")?;
        entry.with_window(|w| w.request_redraw());

        self.entry = Some(entry);
        Ok(())
    }

    /// Tears the GPU stack down and rebuilds it on the same window.
    fn recover(&mut self, message: &str) -> Result<()> {
        log::warn!("device lost ({message}); reinitializing");
        self.app.suspend();

        let Some(entry) = self.entry.take() else {
            return Ok(());
        };
        let window = entry.into_heads().window;

        let entry = build_entry(window, self.gpu_init.clone())
            .context("GPU reinitialization after device loss failed")?;
        entry
            .with_gpu(|gpu| self.app.init(gpu))
            .context("failed to rebuild simulations after device loss")?;

        self.entry = Some(entry);
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (app, Some(entry)) = (&mut self.app, self.entry.as_mut()) else {
            return;
        };

        let applied = entry.with_gpu_mut(|gpu| gpu.resize(size));
        if let Err(err) = entry.with_gpu(|gpu| app.resize(gpu, applied)) {
            log::warn!("resize to {}x{} rejected: {err:#}", applied.width, applied.height);
        }
        entry.with_window(|w| w.request_redraw());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (app, Some(entry)) = (&mut self.app, self.entry.as_mut()) else {
            return;
        };

        let control = entry.with_mut(|fields| {
            let mut ctx = FrameCtx {
                window: fields.window,
                gpu: fields.gpu,
            };
            app.frame(&mut ctx)
        });

        if control == AppControl::Exit {
            self.exit_requested = true;
            event_loop.exit();
            return;
        }

        match entry.with_gpu(|gpu| gpu.take_device_loss()) {
            None => {}
            Some(DeviceLoss::Intentional) => {
                log::info!("device destroyed; shutting down");
                self.exit_requested = true;
                event_loop.exit();
            }
            Some(DeviceLoss::Unexpected(message)) => {
                if let Err(err) = self.recover(&message) {
                    self.fail(event_loop, err);
                }
            }
        }
    }

    fn surface_size(&self) -> Viewport {
        self.entry
            .as_ref()
            .map_or(Viewport::default(), |e| e.with_gpu(|gpu| gpu.size()))
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: App + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(err) = self.create_entry(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous animation: every frame schedules the next.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if let Some(ev) = translate_pointer_event(&event, self.surface_size(), &mut self.cursor) {
            self.app.pointer(ev);
        }

        match event {
            WindowEvent::CloseRequested => {
                self.entry = None;
                self.exit_requested = true;
                event_loop.exit();
            }

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

/// Maps winit mouse and touch events onto the single pointer.
fn translate_pointer_event(
    event: &WindowEvent,
    surface: Viewport,
    cursor: &mut Vec2,
) -> Option<PointerEvent> {
    match event {
        WindowEvent::CursorMoved { position, .. } => {
            *cursor = normalize_position(position.x, position.y, surface);
            Some(PointerEvent::Moved(*cursor))
        }

        WindowEvent::MouseInput {
            state,
            button: MouseButton::Left,
            ..
        } => Some(match state {
            ElementState::Pressed => PointerEvent::Down(*cursor),
            ElementState::Released => PointerEvent::Up,
        }),

        WindowEvent::CursorLeft { .. } => Some(PointerEvent::Left),

        WindowEvent::Touch(touch) => {
            *cursor = normalize_position(touch.location.x, touch.location.y, surface);
            Some(match touch.phase {
                TouchPhase::Started => PointerEvent::Down(*cursor),
                TouchPhase::Moved => PointerEvent::Moved(*cursor),
                // A lifted finger has no hover position.
                TouchPhase::Ended | TouchPhase::Cancelled => PointerEvent::Left,
            })
        }

        _ => None,
    }
}
