//! GPU rendering subsystem.
//!
//! Everything that touches a graphics context sits behind
//! [`GeometryResources`]: one unit-quad mesh, one shader program, and the
//! textures of the placed images. Two implementations exist:
//! - [`WgpuResources`]: wgpu pipeline drawing into a window surface and/or an
//!   offscreen capture target
//! - [`SoftwareResources`]: CPU rasterizer with GL-style readback, used for
//!   headless captures and tests
//!
//! All calls must come from the render thread.

mod error;
mod geometry;
mod software;
mod wgpu_resources;

pub use error::{FatalError, GpuError};
pub use geometry::{
    Bound, ChannelOrder, FrameKind, GeometryResources, RawPixels, ResourceConfig, RowOrder,
    TextureId, QUAD_INDICES, QUAD_POSITIONS, QUAD_TEXCOORDS,
};
pub use software::SoftwareResources;
pub use wgpu_resources::WgpuResources;
