//! Scene model: placed image entities, paint order and the loading state machine.
//!
//! Responsibilities:
//! - own every entity and its GPU texture lifetime
//! - keep paint order stable (insertion order, promotion moves to top)
//! - hit-test in world space
//! - draw frames and normalize captures through [`crate::render::GeometryResources`]

mod capture;
mod collage;
mod config;
mod draw_order;
mod entity;
mod error;
mod placeholder;

pub use capture::normalize as normalize_capture;
pub use collage::{Scene, SceneState};
pub use config::SceneConfig;
pub use draw_order::DrawOrder;
pub use entity::{DecodedImage, Entity, EntityId, EntityKind, ImageSlot, PixelBuffer};
pub use error::SceneError;
pub use placeholder::LoadingBar;
