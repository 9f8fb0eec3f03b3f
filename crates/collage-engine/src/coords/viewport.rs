use glam::{Mat4, Vec3};

use super::Vec2;

/// Closest allowed camera distance. Also the near clip plane.
pub const ZOOM_MIN: f32 = 1.0;
/// Farthest allowed camera distance. Also the far clip plane.
pub const ZOOM_MAX: f32 = 10.0;
/// Zoom a fresh canvas starts with.
pub const DEFAULT_ZOOM: f32 = 3.0;

/// Camera state for the canvas: zoom, surface size and the derived matrices.
///
/// The projection is orthographic with a horizontal half-extent of
/// `zoom * aspect_ratio` and a vertical half-extent of `zoom`. The view looks
/// down -Z from `(0, 0, zoom)`, so the `[ZOOM_MIN, ZOOM_MAX]` depth range always
/// brackets the plane the entities live on.
///
/// `world` is recomputed eagerly on every zoom or size change; readers never
/// observe a matrix that disagrees with the stored zoom/size pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    zoom: f32,
    width: u32,
    height: u32,
    aspect_ratio: f32,
    world: Mat4,
}

impl ViewportState {
    /// Creates a viewport for a 1x1 surface.
    ///
    /// An out-of-range `zoom` falls back to [`DEFAULT_ZOOM`].
    pub fn new(zoom: f32) -> Self {
        let zoom = if in_range(zoom) { zoom } else { DEFAULT_ZOOM };
        let mut v = Self {
            zoom,
            width: 1,
            height: 1,
            aspect_ratio: 1.0,
            world: Mat4::IDENTITY,
        };
        v.recompute();
        v
    }

    /// Stores the surface size and recomputes the world matrix.
    ///
    /// A zero height keeps the previous aspect ratio; the surface is minimized
    /// and nothing will be drawn until it grows again.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        if height > 0 && width > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
        self.recompute();
    }

    /// Sets the zoom if it lies within `[ZOOM_MIN, ZOOM_MAX]`.
    ///
    /// Out-of-range requests are dropped without clamping. Returns whether the
    /// zoom changed.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if !in_range(zoom) {
            return false;
        }
        self.zoom = zoom;
        self.recompute();
        true
    }

    /// Applies a relative zoom step with the same range rule as [`set_zoom`].
    ///
    /// [`set_zoom`]: Self::set_zoom
    pub fn zoom_by(&mut self, delta: f32) -> bool {
        self.set_zoom(self.zoom + delta)
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    #[inline]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    #[inline]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// Surface size in physical pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Half-extents of the visible world rectangle: `(zoom * aspect, zoom)`.
    #[inline]
    pub fn visible_limit(&self) -> Vec2 {
        Vec2::new(self.zoom * self.aspect_ratio, self.zoom)
    }

    /// Converts a surface pixel position (top-left origin, +Y down) to world
    /// coordinates on the entity plane.
    pub fn surface_to_world(&self, px: f32, py: f32) -> Vec2 {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        Vec2::new(
            (px * 2.0 - w) / w * self.zoom * self.aspect_ratio,
            -(py * 2.0 - h) / h * self.zoom,
        )
    }

    fn recompute(&mut self) {
        let half_w = self.zoom * self.aspect_ratio;
        let half_h = self.zoom;

        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, self.zoom), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, ZOOM_MIN, ZOOM_MAX);

        self.world = projection * view;
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM)
    }
}

#[inline]
fn in_range(zoom: f32) -> bool {
    (ZOOM_MIN..=ZOOM_MAX).contains(&zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    // ── zoom ──────────────────────────────────────────────────────────────

    #[test]
    fn set_zoom_within_range_applies() {
        let mut v = ViewportState::default();
        for z in [ZOOM_MIN, 2.5, 7.0, ZOOM_MAX] {
            assert!(v.set_zoom(z));
            assert_eq!(v.zoom(), z);
        }
    }

    #[test]
    fn set_zoom_out_of_range_is_ignored() {
        let mut v = ViewportState::default();
        let before = *v.world_matrix();
        for z in [0.0, 0.999, 10.001, -3.0, f32::NAN, f32::INFINITY] {
            assert!(!v.set_zoom(z));
            assert_eq!(v.zoom(), DEFAULT_ZOOM);
        }
        assert_eq!(*v.world_matrix(), before);
    }

    #[test]
    fn zoom_by_drops_step_past_bound() {
        let mut v = ViewportState::new(9.8);
        assert!(!v.zoom_by(0.5));
        assert_eq!(v.zoom(), 9.8);
        assert!(v.zoom_by(-0.5));
        assert!(approx(v.zoom(), 9.3));
    }

    // ── world matrix ──────────────────────────────────────────────────────

    #[test]
    fn world_maps_visible_corner_to_ndc_corner() {
        let mut v = ViewportState::new(3.0);
        v.set_size(800, 400);
        let limit = v.visible_limit();
        assert!(approx(limit.x, 6.0));
        assert!(approx(limit.y, 3.0));

        let clip = *v.world_matrix() * Vec4::new(limit.x, limit.y, 0.0, 1.0);
        assert!(approx(clip.x / clip.w, 1.0));
        assert!(approx(clip.y / clip.w, 1.0));
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn world_tracks_zoom_changes() {
        let mut v = ViewportState::new(2.0);
        v.set_size(100, 100);
        v.set_zoom(4.0);
        let clip = *v.world_matrix() * Vec4::new(4.0, -4.0, 0.0, 1.0);
        assert!(approx(clip.x, 1.0));
        assert!(approx(clip.y, -1.0));
    }

    #[test]
    fn zero_height_keeps_previous_aspect() {
        let mut v = ViewportState::default();
        v.set_size(200, 100);
        v.set_size(200, 0);
        assert_eq!(v.aspect_ratio(), 2.0);
        assert_eq!(v.size(), (200, 0));
    }

    // ── surface_to_world ──────────────────────────────────────────────────

    #[test]
    fn surface_centre_is_world_origin() {
        let mut v = ViewportState::new(3.0);
        v.set_size(640, 480);
        let p = v.surface_to_world(320.0, 240.0);
        assert!(approx(p.x, 0.0));
        assert!(approx(p.y, 0.0));
    }

    #[test]
    fn surface_top_left_is_negative_x_positive_y() {
        let mut v = ViewportState::new(2.0);
        v.set_size(400, 200);
        let p = v.surface_to_world(0.0, 0.0);
        assert!(approx(p.x, -4.0)); // -zoom * aspect
        assert!(approx(p.y, 2.0)); // +zoom, Y flipped
    }
}
