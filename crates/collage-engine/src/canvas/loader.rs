use std::fmt;

use crate::scene::DecodedImage;

/// Terminal outcome of one image load. Exactly one is delivered per request.
pub enum LoadEvent {
    Loaded(DecodedImage),
    Failed(String),
    Cancelled,
}

impl fmt::Debug for LoadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadEvent::Loaded(img) => write!(f, "Loaded({}x{})", img.width(), img.height()),
            LoadEvent::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
            LoadEvent::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Completion callback. May run on any thread.
pub type LoadCallback = Box<dyn FnOnce(LoadEvent) + Send + 'static>;

/// Identifies a display slot (list row, thumbnail view) a load was issued for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DisplayTarget(pub u64);

/// Asynchronous image loading service.
///
/// Implementations fetch and decode off the calling thread and invoke the
/// callback exactly once with the outcome.
pub trait ImageLoader: Send + Sync {
    fn load_image(&self, url: &str, on_done: LoadCallback);

    /// Cancels loads issued for a display slot. The canvas never cancels its
    /// own loads; list/grid adapters do when a slot is recycled.
    fn cancel_display_task(&self, _target: DisplayTarget) {}
}
