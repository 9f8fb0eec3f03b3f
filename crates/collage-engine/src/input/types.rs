/// Phase of a single-pointer touch gesture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
}

/// Touch sample in surface pixels (top-left origin, +Y down).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub x: f32,
    pub y: f32,
}

impl TouchEvent {
    #[inline]
    pub fn down(x: f32, y: f32) -> Self {
        Self { phase: TouchPhase::Down, x, y }
    }

    #[inline]
    pub fn moved(x: f32, y: f32) -> Self {
        Self { phase: TouchPhase::Move, x, y }
    }

    #[inline]
    pub fn up(x: f32, y: f32) -> Self {
        Self { phase: TouchPhase::Up, x, y }
    }
}

/// Zoom step direction. Zooming in moves the camera closer (smaller zoom).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Signed zoom delta for a step of `step` world units.
    #[inline]
    pub fn delta(self, step: f32) -> f32 {
        match self {
            ZoomDirection::In => -step,
            ZoomDirection::Out => step,
        }
    }
}

/// Platform-agnostic canvas input emitted by the runtime.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CanvasInput {
    Touch(TouchEvent),
    Zoom(ZoomDirection),
    Capture,
    Reload,
    /// Leave the canvas (dispose and exit).
    Close,
}
