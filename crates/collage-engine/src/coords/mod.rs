//! Coordinate and geometry types shared by the scene and the renderers.
//!
//! Canonical world space:
//! - origin at the canvas centre
//! - +X right, +Y up
//! - one world unit is the height of an unscaled image quad
//!
//! Surface (pointer) coordinates are physical pixels with a top-left origin and
//! +Y down; `ViewportState::surface_to_world` converts between the two.

mod color;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use vec2::Vec2;
pub use viewport::{ViewportState, DEFAULT_ZOOM, ZOOM_MAX, ZOOM_MIN};
