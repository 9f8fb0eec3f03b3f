use std::fmt;

use glam::{Mat4, Vec3};
use image::RgbaImage;

use crate::coords::Vec2;
use crate::render::{GeometryResources, GpuError, TextureId};

/// Decoded 8-bit RGBA image as delivered by the loader.
pub type DecodedImage = RgbaImage;

/// Top-down 8-bit RGBA pixels produced by a capture.
pub type PixelBuffer = RgbaImage;

/// Stable identifier of an entity within one scene.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// What an entity draws.
#[derive(Debug)]
pub enum EntityKind {
    /// Flat-coloured loading bar; never carries a texture.
    Placeholder,
    Image(ImageSlot),
}

/// Texture state of an image entity.
///
/// `source` is held until the first upload and dropped afterwards, whether the
/// upload succeeded or not.
#[derive(Debug)]
pub struct ImageSlot {
    source: Option<DecodedImage>,
    texture: Option<TextureId>,
    aspect_ratio: f32,
}

/// One placed quad on the canvas.
#[derive(Debug)]
pub struct Entity {
    pub position: Vec2,
    pub scale: Vec2,
    pub visible: bool,
    kind: EntityKind,
}

impl Entity {
    /// Wraps a decoded image. X scale follows the aspect ratio, Y scale is 1.
    pub fn image(decoded: DecodedImage) -> Self {
        let (w, h) = decoded.dimensions();
        let aspect_ratio = if h == 0 { 1.0 } else { w as f32 / h as f32 };
        Self {
            position: Vec2::zero(),
            scale: Vec2::new(aspect_ratio, 1.0),
            visible: true,
            kind: EntityKind::Image(ImageSlot {
                source: Some(decoded),
                texture: None,
                aspect_ratio,
            }),
        }
    }

    pub fn placeholder() -> Self {
        Self {
            position: Vec2::zero(),
            scale: Vec2::splat(1.0),
            visible: true,
            kind: EntityKind::Placeholder,
        }
    }

    #[inline]
    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, EntityKind::Placeholder)
    }

    pub fn texture(&self) -> Option<TextureId> {
        match &self.kind {
            EntityKind::Image(slot) => slot.texture,
            EntityKind::Placeholder => None,
        }
    }

    /// `width / height` of the source image; 1 for the placeholder.
    pub fn aspect_ratio(&self) -> f32 {
        match &self.kind {
            EntityKind::Image(slot) => slot.aspect_ratio,
            EntityKind::Placeholder => 1.0,
        }
    }

    /// Whether an upload is still outstanding.
    pub fn needs_upload(&self) -> bool {
        matches!(&self.kind, EntityKind::Image(slot) if slot.texture.is_none() && slot.source.is_some())
    }

    /// Image entities draw only once their texture exists.
    pub fn is_drawable(&self) -> bool {
        self.visible && self.texture().is_some()
    }

    /// `translate(position) * scale(scale)`.
    pub fn model(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
    }

    /// Strict containment in the box `[position, position + scale]`.
    pub fn contains(&self, p: Vec2) -> bool {
        let d = p - self.position;
        d.x > 0.0 && d.x < self.scale.x && d.y > 0.0 && d.y < self.scale.y
    }

    /// Creates the texture from the held image and drops the image.
    ///
    /// Returns `Ok(true)` when a texture was created by this call. A failed
    /// upload also drops the image; the entity then never draws.
    pub fn upload<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<bool, GpuError> {
        let EntityKind::Image(slot) = &mut self.kind else {
            return Ok(false);
        };
        if slot.texture.is_some() {
            return Ok(false);
        }
        let Some(source) = slot.source.take() else {
            return Ok(false);
        };
        slot.texture = Some(resources.create_texture(&source)?);
        Ok(true)
    }

    /// Frees the texture and drops any image still held.
    pub fn release<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        if let EntityKind::Image(slot) = &mut self.kind {
            if let Some(texture) = slot.texture.take() {
                resources.destroy_texture(texture);
            }
            slot.source = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SoftwareResources;

    fn image(w: u32, h: u32) -> Entity {
        Entity::image(RgbaImage::new(w, h))
    }

    #[test]
    fn image_scale_follows_aspect_ratio() {
        let e = image(300, 150);
        assert_eq!(e.scale, Vec2::new(2.0, 1.0));
        assert_eq!(e.aspect_ratio(), 2.0);
        assert!(e.needs_upload());
        assert!(!e.is_drawable());
    }

    #[test]
    fn contains_is_strict() {
        let e = image(1, 1);
        assert!(e.contains(Vec2::new(0.5, 0.5)));
        assert!(!e.contains(Vec2::new(1.5, 1.5)));
        assert!(!e.contains(Vec2::new(0.0, 0.5)));
        assert!(!e.contains(Vec2::new(0.5, 1.0)));
    }

    #[test]
    fn contains_uses_scale() {
        let mut e = image(2, 1);
        e.position = Vec2::new(-1.0, -1.0);
        assert!(e.contains(Vec2::new(0.5, -0.5)));
        assert!(!e.contains(Vec2::new(1.01, -0.5)));
    }

    #[test]
    fn model_places_quad_corner_at_position() {
        let mut e = image(2, 1);
        e.position = Vec2::new(3.0, -1.0);
        let far = e.model() * glam::Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert_eq!(far, glam::Vec4::new(5.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn upload_then_release() {
        let mut res = SoftwareResources::default();
        res.initialize().unwrap();

        let mut e = image(2, 2);
        assert_eq!(e.upload(&mut res), Ok(true));
        assert_eq!(e.upload(&mut res), Ok(false));
        assert!(e.is_drawable());
        assert_eq!(res.texture_count(), 1);

        e.release(&mut res);
        assert!(e.texture().is_none());
        assert!(!e.needs_upload());
        assert_eq!(res.texture_count(), 0);
    }

    #[test]
    fn failed_upload_drops_source() {
        let mut res = SoftwareResources::default();
        res.initialize().unwrap();

        let mut e = image(0, 0);
        assert!(e.upload(&mut res).is_err());
        assert!(!e.needs_upload());
        assert!(!e.is_drawable());
    }

    #[test]
    fn placeholder_has_no_texture() {
        let mut res = SoftwareResources::default();
        let mut p = Entity::placeholder();
        assert!(p.is_placeholder());
        assert_eq!(p.upload(&mut res), Ok(false));
        assert!(!p.is_drawable());
    }
}
