use std::sync::{Arc, OnceLock};

use crossbeam_channel::{Receiver, Sender};

use crate::coords::Vec2;
use crate::input::{CanvasInput, TouchEvent, TouchPhase};
use crate::render::{GeometryResources, GpuError};
use crate::scene::{DecodedImage, EntityId, PixelBuffer, Scene, SceneError, SceneState};

use super::command::Command;
use super::handle::{CanvasHandle, Waker};
use super::loader::{ImageLoader, LoadEvent};
use super::pending::PendingLoads;
use super::{CanvasConfig, CanvasListener};

/// How the host should schedule frames.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderMode {
    /// Redraw every frame (the loading bar animates).
    Continuous,
    /// Redraw only when [`CanvasRenderer::needs_redraw`] says so.
    OnDemand,
}

struct Batch {
    id: u64,
    pending: Arc<PendingLoads>,
}

struct Drag {
    id: EntityId,
    last: Vec2,
}

/// Render-thread side of the canvas.
///
/// Owns the [`Scene`] and applies queued commands; other threads talk to it
/// through [`CanvasHandle`]s. The host drives it with surface lifecycle calls
/// and [`render_frame`](Self::render_frame).
pub struct CanvasRenderer {
    config: CanvasConfig,
    scene: Scene,
    loader: Arc<dyn ImageLoader>,
    listener: Option<Box<dyn CanvasListener>>,

    tx: Sender<Command>,
    rx: Receiver<Command>,
    waker: Arc<OnceLock<Waker>>,

    batch: Option<Batch>,
    next_batch: u64,
    urls: Vec<String>,

    drag: Option<Drag>,
    dirty: bool,
}

impl CanvasRenderer {
    pub fn new(config: CanvasConfig, loader: Arc<dyn ImageLoader>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            scene: Scene::new(config.scene.clone()),
            config,
            loader,
            listener: None,
            tx,
            rx,
            waker: Arc::new(OnceLock::new()),
            batch: None,
            next_batch: 1,
            urls: Vec::new(),
            drag: None,
            dirty: true,
        }
    }

    /// A new handle onto this renderer's queue.
    pub fn handle(&self) -> CanvasHandle {
        CanvasHandle::new(self.tx.clone(), Arc::clone(&self.waker))
    }

    /// Installs the callback run after every queued command. First call wins.
    pub fn set_waker(&self, waker: Waker) {
        if self.waker.set(waker).is_err() {
            log::warn!("canvas waker already installed");
        }
    }

    /// Attaches (`Some`) or detaches (`None`) the listener, returning the
    /// previous one. Captures completed while detached are dropped.
    pub fn set_listener(&mut self, listener: Option<Box<dyn CanvasListener>>) -> Option<Box<dyn CanvasListener>> {
        std::mem::replace(&mut self.listener, listener)
    }

    #[inline]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    #[inline]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.scene.state() == SceneState::Disposed
    }

    pub fn render_mode(&self) -> RenderMode {
        match self.scene.state() {
            SceneState::Loading => RenderMode::Continuous,
            SceneState::Ready | SceneState::Disposed => RenderMode::OnDemand,
        }
    }

    /// Whether the next frame would differ from the last one drawn.
    pub fn needs_redraw(&self) -> bool {
        !self.is_disposed() && (self.dirty || self.render_mode() == RenderMode::Continuous)
    }

    // ── surface lifecycle ─────────────────────────────────────────────────

    /// Initializes the geometry resources. A failure disposes the canvas.
    pub fn on_surface_created<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<(), SceneError> {
        self.scene.initialize(resources)?;
        self.dirty = true;
        Ok(())
    }

    pub fn on_surface_changed<R: GeometryResources + ?Sized>(&mut self, resources: &mut R, width: u32, height: u32) {
        resources.resize(width, height);
        self.scene.set_surface_size(width, height);
        self.dirty = true;
        log::debug!("surface {width}x{height}");
    }

    /// Frees everything. The canvas is unusable afterwards.
    pub fn on_surface_destroyed<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        self.dispose(resources);
    }

    // ── commands ──────────────────────────────────────────────────────────

    /// Queues a host input. Inputs are applied with the other commands.
    pub fn push_input(&self, input: CanvasInput) {
        let cmd = match input {
            CanvasInput::Touch(ev) => Command::Touch(ev),
            CanvasInput::Zoom(dir) => Command::ZoomBy(dir.delta(self.config.zoom_step)),
            CanvasInput::Capture => Command::RequestCapture,
            CanvasInput::Reload => Command::Reset,
            CanvasInput::Close => Command::Dispose,
        };
        // The renderer holds its own receiver, so this cannot fail.
        let _ = self.tx.send(cmd);
    }

    /// Applies every queued command. Returns whether any was applied.
    pub fn process_commands<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> bool {
        let mut any = false;
        while let Ok(cmd) = self.rx.try_recv() {
            self.apply(resources, cmd);
            any = true;
        }
        any
    }

    /// Blocks until a command arrives, then applies it and everything queued
    /// behind it.
    pub fn wait_for_commands<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        // The renderer holds a sender, so the channel never disconnects.
        if let Ok(cmd) = self.rx.recv() {
            self.apply(resources, cmd);
        }
        self.process_commands(resources);
    }

    fn apply<R: GeometryResources + ?Sized>(&mut self, resources: &mut R, cmd: Command) {
        log::debug!("command {}", cmd.name());
        match cmd {
            Command::AddImages(urls) => self.start_batch(resources, urls),
            Command::Reset => {
                let urls = self.urls.clone();
                self.start_batch(resources, urls);
            }
            Command::Touch(ev) => self.touch(ev),
            Command::ZoomBy(delta) => {
                if self.scene.zoom_by(delta) {
                    self.dirty = true;
                }
            }
            Command::RequestCapture => {
                self.scene.request_capture();
                self.dirty = true;
            }
            Command::Dispose => self.dispose(resources),
            Command::ImageLoaded { batch, image } => self.image_loaded(batch, image),
            Command::LoadSettled { batch, remaining } => self.load_settled(batch, remaining),
        }
    }

    // ── loading ───────────────────────────────────────────────────────────

    fn start_batch<R: GeometryResources + ?Sized>(&mut self, resources: &mut R, urls: Vec<String>) {
        if self.is_disposed() {
            log::warn!("ignored {} images: canvas disposed", urls.len());
            return;
        }

        if self.batch.is_some() || !self.scene.is_empty() {
            if let Err(e) = self.scene.clear_state(resources) {
                log::warn!("clear before reload failed: {e}");
                return;
            }
        }
        self.drag = None;

        let total = urls.len();
        if let Err(e) = self.scene.begin_loading(total) {
            log::warn!("cannot start loading: {e}");
            return;
        }

        let id = self.next_batch;
        self.next_batch += 1;
        let pending = Arc::new(PendingLoads::new(total));
        self.batch = Some(Batch { id, pending: Arc::clone(&pending) });
        self.urls = urls.clone();
        self.dirty = true;
        log::info!("loading batch {id} ({total} images)");
        self.notify_progress(total, total);

        if total == 0 {
            self.finish_loading();
            return;
        }

        for url in urls {
            let handle = self.handle();
            let pending = Arc::clone(&pending);
            let label = url.clone();
            self.loader.load_image(
                &url,
                Box::new(move |event| {
                    let reason = match event {
                        LoadEvent::Loaded(image) => {
                            handle.send(Command::ImageLoaded { batch: id, image });
                            return;
                        }
                        LoadEvent::Failed(reason) => reason,
                        LoadEvent::Cancelled => "cancelled".to_string(),
                    };
                    log::warn!("image {label} skipped: {reason}");
                    if let Some(remaining) = pending.complete_one() {
                        handle.send(Command::LoadSettled { batch: id, remaining });
                    }
                }),
            );
        }
    }

    fn current_batch(&self, batch: u64) -> Option<Arc<PendingLoads>> {
        match &self.batch {
            Some(b) if b.id == batch && self.scene.state() == SceneState::Loading => Some(Arc::clone(&b.pending)),
            _ => {
                log::debug!("ignored completion of stale batch {batch}");
                None
            }
        }
    }

    fn image_loaded(&mut self, batch: u64, image: DecodedImage) {
        let Some(pending) = self.current_batch(batch) else { return };
        if let Err(e) = self.scene.add_entity(image) {
            log::warn!("loaded image dropped: {e}");
        }
        match pending.complete_one() {
            Some(0) => self.finish_loading(),
            Some(remaining) => self.progress(remaining),
            None => log::warn!("surplus completion for batch {batch}"),
        }
    }

    fn load_settled(&mut self, batch: u64, remaining: usize) {
        let Some(pending) = self.current_batch(batch) else { return };
        if remaining == 0 {
            self.finish_loading();
        } else {
            self.progress(pending.remaining());
        }
    }

    fn progress(&mut self, remaining: usize) {
        self.scene.report_progress(remaining);
        let (_, total) = self.scene.progress();
        self.notify_progress(remaining, total);
    }

    fn finish_loading(&mut self) {
        let (_, total) = self.scene.progress();
        self.scene.report_progress(0);
        if let Err(e) = self.scene.transition_to_ready() {
            log::warn!("batch settled but scene not ready: {e}");
            return;
        }
        self.dirty = true;
        self.notify_progress(0, total);
        if let Some(l) = self.listener.as_mut() {
            l.on_ready();
        }
    }

    fn notify_progress(&mut self, remaining: usize, total: usize) {
        if let Some(l) = self.listener.as_mut() {
            l.on_loading_progress(remaining, total);
        }
    }

    // ── touch ─────────────────────────────────────────────────────────────

    fn touch(&mut self, ev: TouchEvent) {
        if self.scene.state() != SceneState::Ready {
            return;
        }
        let p = self.scene.viewport().surface_to_world(ev.x, ev.y);

        match ev.phase {
            TouchPhase::Down => {
                self.drag = self.scene.hit_test(p).map(|id| {
                    self.scene.promote_to_top(id);
                    Drag { id, last: p }
                });
                if self.drag.is_some() {
                    self.dirty = true;
                }
            }
            TouchPhase::Move => {
                let Some(drag) = self.drag.as_mut() else { return };
                let delta = p - drag.last;
                drag.last = p;
                let id = drag.id;
                if let Err(e) = self.scene.move_entity_by(id, delta) {
                    log::debug!("drag ended: {e}");
                    self.drag = None;
                }
                self.dirty = true;
            }
            TouchPhase::Up => self.drag = None,
        }
    }

    // ── frames ────────────────────────────────────────────────────────────

    /// Applies queued commands and draws one frame. A requested capture is
    /// handed to the listener.
    pub fn render_frame<R: GeometryResources + ?Sized>(&mut self, resources: &mut R, dt: f32) -> Result<(), GpuError> {
        self.process_commands(resources);
        match self.scene.render_frame(resources, dt) {
            Ok(captured) => {
                self.dirty = false;
                if let Some(image) = captured {
                    self.deliver(image);
                }
                Ok(())
            }
            Err(e) => {
                log::error!("frame failed: {e}");
                Err(e)
            }
        }
    }

    /// Draws one frame with a capture and returns it instead of notifying the
    /// listener.
    pub fn render_capture<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<PixelBuffer, GpuError> {
        self.process_commands(resources);
        self.scene.request_capture();
        let captured = self.scene.render_frame(resources, 0.0)?;
        self.dirty = false;
        captured.ok_or(GpuError::NoCapturePending)
    }

    fn deliver(&mut self, image: PixelBuffer) {
        match self.listener.as_mut() {
            Some(l) => {
                log::info!("captured {}x{}", image.width(), image.height());
                l.on_captured(image);
            }
            None => log::warn!("capture dropped: no listener attached"),
        }
    }

    fn dispose<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        self.batch = None;
        self.drag = None;
        self.scene.dispose(resources);
    }
}
