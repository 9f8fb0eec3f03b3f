//! Threaded front of the scene.
//!
//! [`CanvasRenderer`] lives on the render thread and owns the [`Scene`](crate::scene::Scene).
//! Everything else (UI code, image loaders) holds a [`CanvasHandle`] and
//! enqueues commands. Load completions come back through the same queue, so
//! the scene is never touched off the render thread.

mod command;
mod config;
mod handle;
mod headless;
mod listener;
mod loader;
mod pending;
mod renderer;

pub use config::CanvasConfig;
pub use handle::{CanvasHandle, Waker};
pub use headless::render_offscreen;
pub use listener::CanvasListener;
pub use loader::{DisplayTarget, ImageLoader, LoadCallback, LoadEvent};
pub use pending::PendingLoads;
pub use renderer::{CanvasRenderer, RenderMode};
