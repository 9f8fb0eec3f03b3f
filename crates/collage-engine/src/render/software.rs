use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec4};
use image::RgbaImage;

use super::geometry::{
    ChannelOrder, FrameKind, GeometryResources, RawPixels, ResourceConfig, RowOrder, TextureId,
};
use super::{FatalError, GpuError};

/// Largest texture edge accepted, matching wgpu's default `max_texture_dimension_2d`.
const MAX_TEXTURE_DIM: u32 = 8192;

/// CPU implementation of [`GeometryResources`].
///
/// Rasterizes the unit quad by inverse-mapping each covered pixel centre into
/// quad space and sampling the texture with nearest filtering. The framebuffer
/// is stored top-down; `read_pixels` hands it out bottom-up in RGBA order, the
/// way `glReadPixels` does, so the capture path exercises its row flip.
pub struct SoftwareResources {
    config: ResourceConfig,
    initialized: bool,
    bound: Option<FrameKind>,

    width: u32,
    height: u32,
    framebuffer: Vec<u8>,

    textures: HashMap<TextureId, RgbaImage>,
    next_texture: u32,

    capture_ready: bool,
    frame_draws: usize,
}

impl SoftwareResources {
    pub fn new(config: ResourceConfig) -> Self {
        Self {
            config,
            initialized: false,
            bound: None,
            width: 0,
            height: 0,
            framebuffer: Vec::new(),
            textures: HashMap::new(),
            next_texture: 1,
            capture_ready: false,
            frame_draws: 0,
        }
    }

    /// Pixel of the last frame at `(x, y)`, top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let p = &self.framebuffer[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Draw calls issued since the last `bind`.
    pub fn frame_draws(&self) -> usize {
        self.frame_draws
    }

    fn clear(&mut self) {
        let rgba = self.config.clear_color.to_rgba8();
        for px in self.framebuffer.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn rasterize(&mut self, mvp: &Mat4, texture: Option<TextureId>) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        // Orthographic world and affine model: w stays 1, so NDC = A * uv + b.
        let ax = mvp.x_axis.truncate().truncate();
        let ay = mvp.y_axis.truncate().truncate();
        let b = mvp.w_axis.truncate().truncate();
        let det = ax.x * ay.y - ay.x * ax.y;
        if det.abs() < f32::EPSILON {
            return;
        }

        let (w, h) = (self.width as f32, self.height as f32);

        // Pixel-space bounds of the transformed quad.
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for corner in [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE] {
            let ndc = ax * corner.x + ay * corner.y + b;
            let p = Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h);
            min = min.min(p);
            max = max.max(p);
        }
        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = (max.x.ceil().min(w)).max(0.0) as u32;
        let y1 = (max.y.ceil().min(h)).max(0.0) as u32;

        let fill = self.config.placeholder_color.to_rgba8();
        let tex = texture.and_then(|t| self.textures.get(&t));
        if texture.is_some() && tex.is_none() {
            log::warn!("draw with unknown texture {texture:?}; skipped");
            return;
        }

        for py in y0..y1 {
            for px in x0..x1 {
                let ndc = Vec2::new(
                    (px as f32 + 0.5) / w * 2.0 - 1.0,
                    1.0 - (py as f32 + 0.5) / h * 2.0,
                );
                let d = ndc - b;
                let u = (d.x * ay.y - ay.x * d.y) / det;
                let v = (ax.x * d.y - d.x * ax.y) / det;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }

                let src = match tex {
                    Some(img) => sample_nearest(img, u, 1.0 - v),
                    None => fill,
                };
                let i = ((py as usize) * (self.width as usize) + px as usize) * 4;
                blend_straight_alpha(&mut self.framebuffer[i..i + 4], src);
            }
        }
    }
}

impl Default for SoftwareResources {
    fn default() -> Self {
        Self::new(ResourceConfig::default())
    }
}

impl GeometryResources for SoftwareResources {
    fn initialize(&mut self) -> Result<(), FatalError> {
        self.initialized = true;
        log::debug!("software geometry resources initialized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.framebuffer = vec![0; (width as usize) * (height as usize) * 4];
        self.capture_ready = false;
        self.clear();
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureId, GpuError> {
        let (width, height) = image.dimensions();
        if !self.initialized {
            return Err(GpuError::NotInitialized);
        }
        if width == 0 || height == 0 || width > MAX_TEXTURE_DIM || height > MAX_TEXTURE_DIM {
            return Err(GpuError::TextureUpload {
                width,
                height,
                reason: format!("dimensions must be within 1..={MAX_TEXTURE_DIM}"),
            });
        }

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, image.clone());
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn bind(&mut self, frame: FrameKind) -> Result<(), GpuError> {
        if !self.initialized {
            return Err(GpuError::NotInitialized);
        }
        self.bound = Some(frame);
        self.frame_draws = 0;
        self.capture_ready = false;
        self.clear();
        Ok(())
    }

    fn draw(&mut self, world: &Mat4, model: &Mat4, texture: Option<TextureId>) {
        if self.bound.is_none() {
            log::warn!("draw outside bind/unbind ignored");
            return;
        }
        self.frame_draws += 1;
        let mvp = *world * *model;
        self.rasterize(&mvp, texture);
    }

    fn unbind(&mut self) {
        if let Some(frame) = self.bound.take() {
            self.capture_ready = frame == FrameKind::Capture;
        }
    }

    fn read_pixels(&mut self) -> Result<RawPixels, GpuError> {
        if !self.capture_ready {
            return Err(GpuError::NoCapturePending);
        }
        self.capture_ready = false;

        let row = self.width as usize * 4;
        let mut data = Vec::with_capacity(self.framebuffer.len());
        for line in self.framebuffer.chunks_exact(row.max(1)).rev() {
            data.extend_from_slice(line);
        }

        Ok(RawPixels {
            width: self.width,
            height: self.height,
            data,
            row_order: RowOrder::BottomUp,
            channel_order: ChannelOrder::Rgba,
        })
    }

    fn destroy(&mut self) {
        if !self.initialized && self.textures.is_empty() {
            return;
        }
        self.textures.clear();
        self.bound = None;
        self.capture_ready = false;
        self.initialized = false;
        log::debug!("software geometry resources destroyed");
    }
}

fn sample_nearest(img: &RgbaImage, s: f32, t: f32) -> [u8; 4] {
    let (tw, th) = img.dimensions();
    let x = ((s * tw as f32) as u32).min(tw - 1);
    let y = ((t * th as f32) as u32).min(th - 1);
    img.get_pixel(x, y).0
}

fn blend_straight_alpha(dst: &mut [u8], src: [u8; 4]) {
    let s = Vec4::from_array(src.map(|c| c as f32 / 255.0));
    let d = Vec4::new(
        dst[0] as f32 / 255.0,
        dst[1] as f32 / 255.0,
        dst[2] as f32 / 255.0,
        dst[3] as f32 / 255.0,
    );
    let a = s.w;
    let out = s * a + d * (1.0 - a);
    for (c, v) in dst.iter_mut().zip(out.to_array()) {
        *c = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}
