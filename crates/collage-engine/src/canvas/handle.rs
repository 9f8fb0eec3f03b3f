use std::sync::{Arc, OnceLock};

use crossbeam_channel::Sender;

use crate::input::TouchEvent;

use super::command::Command;

/// Callback that nudges the render loop after a command is queued.
pub type Waker = Box<dyn Fn() + Send + Sync>;

/// Cloneable, thread-safe front of a [`CanvasRenderer`](super::CanvasRenderer).
///
/// Every method only enqueues; the render thread applies commands in order
/// before its next frame. Sends after the renderer is gone are dropped.
#[derive(Clone)]
pub struct CanvasHandle {
    tx: Sender<Command>,
    waker: Arc<OnceLock<Waker>>,
}

impl CanvasHandle {
    pub(crate) fn new(tx: Sender<Command>, waker: Arc<OnceLock<Waker>>) -> Self {
        Self { tx, waker }
    }

    /// Replaces the canvas contents with the images behind `urls`.
    pub fn add_images<I, S>(&self, urls: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(Command::AddImages(urls.into_iter().map(Into::into).collect()))
    }

    pub fn touch(&self, event: TouchEvent) -> bool {
        self.send(Command::Touch(event))
    }

    pub fn zoom_by(&self, delta: f32) -> bool {
        self.send(Command::ZoomBy(delta))
    }

    pub fn request_capture(&self) -> bool {
        self.send(Command::RequestCapture)
    }

    /// Reloads the last URL list from scratch.
    pub fn reset(&self) -> bool {
        self.send(Command::Reset)
    }

    pub fn dispose(&self) -> bool {
        self.send(Command::Dispose)
    }

    pub(crate) fn send(&self, cmd: Command) -> bool {
        let name = cmd.name();
        if self.tx.send(cmd).is_err() {
            log::debug!("canvas gone; dropped {name} command");
            return false;
        }
        if let Some(wake) = self.waker.get() {
            wake();
        }
        true
    }
}
