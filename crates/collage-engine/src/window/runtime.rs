use std::sync::Mutex;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::canvas::{CanvasRenderer, RenderMode};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::translate_window_event;
use crate::input::PointerState;
use crate::render::WgpuResources;
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "collage".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Sent by canvas handles when a command is queued off the event loop.
#[derive(Debug, Copy, Clone)]
struct Wake;

/// Runs a canvas in a single window until it is closed or disposed.
///
/// The event loop thread is the render thread: the renderer, its scene and the
/// GPU resources never leave it.
pub struct CanvasRuntime;

impl CanvasRuntime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit, renderer: CanvasRenderer) -> Result<()> {
        let event_loop = EventLoop::<Wake>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;

        let proxy = Mutex::new(event_loop.create_proxy());
        renderer.set_waker(Box::new(move || {
            if let Ok(proxy) = proxy.lock() {
                // Fails only once the loop has exited.
                let _ = proxy.send_event(Wake);
            }
        }));

        let mut state = AppState::new(config, gpu_init, renderer);
        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    pointer: PointerState,
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    renderer: CanvasRenderer,

    // Dropped before `window`: resources hold clones of the window's device.
    resources: Option<WgpuResources>,
    window: Option<WindowEntry>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, renderer: CanvasRenderer) -> Self {
        Self {
            config,
            gpu_init,
            renderer,
            resources: None,
            window: None,
            exit_requested: false,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            pointer: PointerState::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let mut resources = entry.with_gpu(|gpu| {
            WgpuResources::new(
                gpu.device().clone(),
                gpu.queue().clone(),
                gpu.surface_format(),
                self.renderer.config().resources.clone(),
            )
        });
        let size = entry.with_gpu(|gpu| gpu.size());

        self.renderer
            .on_surface_created(&mut resources)
            .context("failed to initialize canvas resources")?;
        self.renderer
            .on_surface_changed(&mut resources, size.width, size.height);

        entry.with_window(|w| w.request_redraw());
        self.resources = Some(resources);
        self.window = Some(entry);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(resources) = self.resources.as_mut() {
            self.renderer.on_surface_destroyed(resources);
        }
        self.resources = None;
        self.window = None;
        self.exit_requested = true;
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(entry), Some(resources)) = (self.window.as_mut(), self.resources.as_mut()) else {
            return;
        };
        entry.with_gpu_mut(|gpu| gpu.resize(size));
        self.renderer.on_surface_changed(resources, size.width, size.height);
        entry.with_window(|w| w.request_redraw());
    }

    /// Applies queued commands and schedules a redraw if they changed anything.
    fn pump(&mut self, event_loop: &ActiveEventLoop) {
        let Some(resources) = self.resources.as_mut() else {
            return;
        };
        self.renderer.process_commands(resources);

        if self.renderer.is_disposed() {
            self.shutdown(event_loop);
            return;
        }
        if self.renderer.needs_redraw() {
            if let Some(entry) = self.window.as_ref() {
                entry.with_window(|w| w.request_redraw());
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Self { renderer, resources, window, .. } = self;
        let (Some(entry), Some(resources)) = (window.as_mut(), resources.as_mut()) else {
            return;
        };

        let size = entry.with_gpu(|gpu| gpu.size());
        if size.width == 0 || size.height == 0 {
            return;
        }

        let mut fatal = false;
        entry.with_mut(|fields| {
            let ft = fields.clock.tick();

            let frame = match fields.gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("surface acquire failed: {err}");
                    match fields.gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured => fields.window.request_redraw(),
                        SurfaceErrorAction::SkipFrame => {}
                        SurfaceErrorAction::Fatal => fatal = true,
                    }
                    return;
                }
            };

            resources.set_target(Some(frame.view.clone()));
            let result = renderer.render_frame(resources, ft.dt);
            resources.set_target(None);

            fields.window.pre_present_notify();
            fields.gpu.present(frame);

            if let Err(e) = result {
                log::error!("frame {} dropped: {e}", ft.frame_index);
            }
        });

        if fatal || renderer.is_disposed() {
            self.shutdown(event_loop);
        }
    }
}

impl ApplicationHandler<Wake> for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create canvas window: {e:#}");
            self.shutdown(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: Wake) {
        self.pump(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match self.renderer.render_mode() {
            RenderMode::Continuous => {
                event_loop.set_control_flow(ControlFlow::Poll);
                if let Some(entry) = self.window.as_ref() {
                    entry.with_window(|w| w.request_redraw());
                }
            }
            RenderMode::OnDemand => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
                return;
            }

            WindowEvent::Resized(new_size) => self.resize(*new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.window.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                return;
            }

            _ => {}
        }

        let input = self
            .window
            .as_mut()
            .and_then(|entry| entry.with_mut(|fields| translate_window_event(fields.pointer, &event)));

        if let Some(input) = input {
            self.renderer.push_input(input);
            self.pump(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(resources) = self.resources.as_mut() {
            self.renderer.on_surface_destroyed(resources);
        }
    }
}
