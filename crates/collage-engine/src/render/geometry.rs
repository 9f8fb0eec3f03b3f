use std::fmt;

use glam::Mat4;
use image::RgbaImage;

use crate::coords::ColorRgba;

use super::{FatalError, GpuError};

// ── unit quad ─────────────────────────────────────────────────────────────

/// Unit quad positions. Anchored at the model origin, extending +1 in X and Y.
pub const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
];

/// Texture coordinates matching [`QUAD_POSITIONS`]; image row 0 lands at the top edge.
pub const QUAD_TEXCOORDS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];

/// Two triangles.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── handles and readback ──────────────────────────────────────────────────

/// Opaque handle of a texture owned by a [`GeometryResources`] implementation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Purpose of a bound frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameKind {
    /// Draw to the presentation target only.
    Present,
    /// Also keep the result for a following [`GeometryResources::read_pixels`].
    Capture,
}

/// Row order of a readback buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowOrder {
    TopDown,
    /// First row is the bottom of the image (GL `glReadPixels` convention).
    BottomUp,
}

/// Byte order of each 4-byte pixel in a readback buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
}

/// Unprocessed framebuffer contents, tightly packed (`width * 4` bytes per row).
#[derive(Debug, Clone, PartialEq)]
pub struct RawPixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub row_order: RowOrder,
    pub channel_order: ChannelOrder,
}

/// Fixed render state shared by every implementation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ResourceConfig {
    /// Background the frame is cleared to on bind.
    pub clear_color: ColorRgba,
    /// Fill used for draws without a texture (the loading placeholder).
    pub placeholder_color: ColorRgba,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            clear_color: ColorRgba::new(0.3, 0.5, 0.1, 0.0),
            placeholder_color: ColorRgba::white(),
        }
    }
}

// ── resource contract ─────────────────────────────────────────────────────

/// Shader program, quad mesh and textures of one GPU context.
///
/// Lifecycle: `initialize` once, then any number of frames, then `destroy`.
/// A frame is `bind` → `draw`* → `unbind`; go through [`Bound`] rather than
/// calling the pair directly so that `unbind` runs on every exit path.
///
/// Blending is straight alpha (`src_alpha`, `one_minus_src_alpha`), applied to
/// color and alpha alike.
pub trait GeometryResources {
    /// Compiles shaders, links the program and uploads the mesh.
    fn initialize(&mut self) -> Result<(), FatalError>;

    fn is_initialized(&self) -> bool;

    /// Resizes the render targets. Zero-sized targets are allowed; frames drawn
    /// into them are empty.
    fn resize(&mut self, width: u32, height: u32);

    /// Target size in physical pixels.
    fn size(&self) -> (u32, u32);

    fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureId, GpuError>;

    /// Frees a texture. Unknown ids are ignored.
    fn destroy_texture(&mut self, texture: TextureId);

    /// Clears the target and activates program, mesh and sampler.
    fn bind(&mut self, frame: FrameKind) -> Result<(), GpuError>;

    /// Draws the unit quad transformed by `world * model`.
    ///
    /// `texture = None` fills with the placeholder color.
    fn draw(&mut self, world: &Mat4, model: &Mat4, texture: Option<TextureId>);

    /// Deactivates everything `bind` activated and finishes the frame.
    fn unbind(&mut self);

    /// Reads back the last frame bound with [`FrameKind::Capture`].
    fn read_pixels(&mut self) -> Result<RawPixels, GpuError>;

    /// Frees program, mesh and every texture. Idempotent.
    fn destroy(&mut self);
}

/// Scoped `bind`/`unbind` pair.
///
/// Holding the guard borrows the resources mutably, so no other resource
/// operation can interleave with the frame. Dropping it unbinds.
pub struct Bound<'a, R: GeometryResources + ?Sized> {
    resources: &'a mut R,
}

impl<'a, R: GeometryResources + ?Sized> Bound<'a, R> {
    pub fn new(resources: &'a mut R, frame: FrameKind) -> Result<Self, GpuError> {
        resources.bind(frame)?;
        Ok(Self { resources })
    }

    #[inline]
    pub fn draw(&mut self, world: &Mat4, model: &Mat4, texture: Option<TextureId>) {
        self.resources.draw(world, model, texture);
    }
}

impl<R: GeometryResources + ?Sized> Drop for Bound<'_, R> {
    fn drop(&mut self) {
        self.resources.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the call sequence; `bind` fails on demand.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_bind: bool,
    }

    impl GeometryResources for Recorder {
        fn initialize(&mut self) -> Result<(), FatalError> {
            Ok(())
        }
        fn is_initialized(&self) -> bool {
            true
        }
        fn resize(&mut self, _: u32, _: u32) {}
        fn size(&self) -> (u32, u32) {
            (1, 1)
        }
        fn create_texture(&mut self, _: &RgbaImage) -> Result<TextureId, GpuError> {
            Ok(TextureId(1))
        }
        fn destroy_texture(&mut self, _: TextureId) {}
        fn bind(&mut self, _: FrameKind) -> Result<(), GpuError> {
            if self.fail_bind {
                return Err(GpuError::NotInitialized);
            }
            self.calls.push("bind");
            Ok(())
        }
        fn draw(&mut self, _: &Mat4, _: &Mat4, _: Option<TextureId>) {
            self.calls.push("draw");
        }
        fn unbind(&mut self) {
            self.calls.push("unbind");
        }
        fn read_pixels(&mut self) -> Result<RawPixels, GpuError> {
            Err(GpuError::NoCapturePending)
        }
        fn destroy(&mut self) {}
    }

    fn draw_then_bail(r: &mut Recorder) -> Result<(), GpuError> {
        let mut bound = Bound::new(r, FrameKind::Present)?;
        bound.draw(&Mat4::IDENTITY, &Mat4::IDENTITY, None);
        Err(GpuError::Readback("simulated".into()))
    }

    #[test]
    fn guard_unbinds_on_early_return() {
        let mut r = Recorder::default();
        assert!(draw_then_bail(&mut r).is_err());
        assert_eq!(r.calls, ["bind", "draw", "unbind"]);
    }

    #[test]
    fn failed_bind_does_not_unbind() {
        let mut r = Recorder { fail_bind: true, ..Default::default() };
        assert!(Bound::new(&mut r, FrameKind::Present).is_err());
        assert!(r.calls.is_empty());
    }

    #[test]
    fn guard_works_through_trait_object() {
        let mut r = Recorder::default();
        {
            let dynr: &mut dyn GeometryResources = &mut r;
            let mut bound = Bound::new(dynr, FrameKind::Capture).unwrap();
            bound.draw(&Mat4::IDENTITY, &Mat4::IDENTITY, Some(TextureId(1)));
            bound.draw(&Mat4::IDENTITY, &Mat4::IDENTITY, None);
        }
        assert_eq!(r.calls, ["bind", "draw", "draw", "unbind"]);
    }
}
