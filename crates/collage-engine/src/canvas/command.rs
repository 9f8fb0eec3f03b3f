use crate::input::TouchEvent;
use crate::scene::DecodedImage;

/// Work item for the render thread. Built on any thread, executed in order
/// before the next frame.
pub(crate) enum Command {
    /// Start a new load batch, superseding any batch in flight.
    AddImages(Vec<String>),
    Touch(TouchEvent),
    ZoomBy(f32),
    RequestCapture,
    /// Start over with the last URL list.
    Reset,
    Dispose,

    /// A load of `batch` succeeded; the render thread creates the entity and
    /// counts it down.
    ImageLoaded { batch: u64, image: DecodedImage },
    /// A load of `batch` failed or was cancelled; the loader thread already
    /// counted it down to `remaining`.
    LoadSettled { batch: u64, remaining: usize },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::AddImages(_) => "add-images",
            Command::Touch(_) => "touch",
            Command::ZoomBy(_) => "zoom-by",
            Command::RequestCapture => "request-capture",
            Command::Reset => "reset",
            Command::Dispose => "dispose",
            Command::ImageLoaded { .. } => "image-loaded",
            Command::LoadSettled { .. } => "load-settled",
        }
    }
}
