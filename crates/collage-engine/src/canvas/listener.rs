use crate::scene::PixelBuffer;

/// Receiver of canvas results. Called on the render thread; long work
/// (encoding, disk I/O) belongs on another thread.
pub trait CanvasListener: Send {
    /// A requested capture, top-down RGBA at surface size.
    fn on_captured(&mut self, image: PixelBuffer);

    /// Loads still outstanding in the current batch.
    fn on_loading_progress(&mut self, _remaining: usize, _total: usize) {}

    /// The batch settled and the canvas became interactive.
    fn on_ready(&mut self) {}
}
