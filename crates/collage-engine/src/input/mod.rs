//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The runtime translates window events into [`CanvasInput`]s; a mouse stands
//! in for a single finger.

mod state;
mod types;

pub mod platform;

pub use state::PointerState;
pub use types::{CanvasInput, TouchEvent, TouchPhase, ZoomDirection};
