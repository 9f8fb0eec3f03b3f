use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::coords::{Vec2, ViewportState};
use crate::render::{Bound, FrameKind, GeometryResources, GpuError};

use super::capture;
use super::placeholder::LoadingBar;
use super::{DecodedImage, DrawOrder, Entity, EntityId, PixelBuffer, SceneConfig, SceneError};

/// Lifecycle of a [`Scene`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SceneState {
    /// Images are still arriving; only the loading bar is drawn.
    Loading,
    /// Every pending load has settled; entities are drawn and interactive.
    Ready,
    /// Terminal. Every GPU resource has been freed.
    Disposed,
}

/// The collage: entities, their paint order, the viewport and the
/// loading/ready/disposed state machine.
///
/// Owned by the render thread. Every method that touches GPU state takes the
/// [`GeometryResources`] explicitly so the scene never outlives its context.
pub struct Scene {
    config: SceneConfig,
    state: SceneState,
    viewport: ViewportState,

    entities: HashMap<EntityId, Entity>,
    order: DrawOrder,
    next_id: u32,

    placeholder: Entity,
    bar: LoadingBar,
    expected: usize,
    remaining: usize,

    capture_requested: bool,
    rng: StdRng,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut scene = Self {
            viewport: ViewportState::new(config.initial_zoom),
            config,
            state: SceneState::Loading,
            entities: HashMap::new(),
            order: DrawOrder::new(),
            next_id: 1,
            placeholder: Entity::placeholder(),
            bar: LoadingBar::default(),
            expected: 0,
            remaining: 0,
            capture_requested: false,
            rng,
        };
        scene.refresh_placeholder();
        scene
    }

    /// Initializes the geometry resources. A failure disposes the scene.
    pub fn initialize<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<(), SceneError> {
        if self.state == SceneState::Disposed {
            return Err(SceneError::Disposed);
        }
        if let Err(e) = resources.initialize() {
            log::error!("geometry initialization failed: {e}");
            self.dispose(resources);
            return Err(e.into());
        }
        log::info!("scene initialized");
        Ok(())
    }

    // ── reads ─────────────────────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> SceneState {
        self.state
    }

    #[inline]
    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    #[inline]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids bottom to top.
    #[inline]
    pub fn draw_order(&self) -> &[EntityId] {
        self.order.as_slice()
    }

    #[inline]
    pub fn placeholder(&self) -> &Entity {
        &self.placeholder
    }

    /// `(remaining, expected)` of the current loading cycle.
    #[inline]
    pub fn progress(&self) -> (usize, usize) {
        (self.remaining, self.expected)
    }

    #[inline]
    pub fn capture_requested(&self) -> bool {
        self.capture_requested
    }

    // ── entities ──────────────────────────────────────────────────────────

    /// Adds an image entity on top of the draw order.
    ///
    /// On a disposed scene the image is dropped and nothing is created.
    pub fn add_entity(&mut self, image: DecodedImage) -> Result<EntityId, SceneError> {
        if self.state == SceneState::Disposed {
            return Err(SceneError::Disposed);
        }
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, Entity::image(image));
        self.order.push(id);
        log::debug!("added {id}");
        Ok(id)
    }

    pub fn set_entity_position(&mut self, id: EntityId, position: Vec2) -> Result<(), SceneError> {
        self.entity_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_entity_scale(&mut self, id: EntityId, scale: Vec2) -> Result<(), SceneError> {
        self.entity_mut(id)?.scale = scale;
        Ok(())
    }

    /// Offsets an entity. Unbounded: entities may leave the visible area.
    pub fn move_entity_by(&mut self, id: EntityId, delta: Vec2) -> Result<(), SceneError> {
        self.entity_mut(id)?.position += delta;
        Ok(())
    }

    /// Topmost visible entity whose box strictly contains `p`.
    ///
    /// Always `None` unless the scene is ready.
    pub fn hit_test(&self, p: Vec2) -> Option<EntityId> {
        if self.state != SceneState::Ready {
            return None;
        }
        self.order
            .iter()
            .rev()
            .find(|id| self.entities.get(id).is_some_and(|e| e.visible && e.contains(p)))
    }

    /// Moves `id` to the top of the draw order. No-op unless ready.
    pub fn promote_to_top(&mut self, id: EntityId) -> bool {
        if self.state != SceneState::Ready {
            return false;
        }
        self.order.promote(id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        if self.state == SceneState::Disposed {
            return Err(SceneError::Disposed);
        }
        self.entities.get_mut(&id).ok_or(SceneError::UnknownEntity(id))
    }

    // ── loading cycle ─────────────────────────────────────────────────────

    /// Starts (or restarts) a loading cycle expecting `expected` images.
    pub fn begin_loading(&mut self, expected: usize) -> Result<(), SceneError> {
        if self.state == SceneState::Disposed {
            return Err(SceneError::Disposed);
        }
        self.state = SceneState::Loading;
        self.expected = expected;
        self.remaining = expected;
        self.refresh_placeholder();
        log::debug!("loading {expected} images");
        Ok(())
    }

    /// Shrinks the loading bar to `remaining / expected`.
    pub fn report_progress(&mut self, remaining: usize) {
        if self.state != SceneState::Loading {
            return;
        }
        self.remaining = remaining.min(self.expected);
        self.refresh_placeholder();
    }

    /// Leaves the loading state and scatters every entity over the visible
    /// area. Allowed once per loading cycle.
    pub fn transition_to_ready(&mut self) -> Result<(), SceneError> {
        match self.state {
            SceneState::Loading => {}
            SceneState::Disposed => return Err(SceneError::Disposed),
            from => {
                log::warn!("ignored transition to ready from {from:?}");
                return Err(SceneError::InvalidTransition { from });
            }
        }

        let limit = self.viewport.visible_limit() * self.config.spread.abs();
        for id in self.order.iter() {
            if let Some(e) = self.entities.get_mut(&id) {
                e.position = Vec2::new(
                    self.rng.random_range(-limit.x..=limit.x),
                    self.rng.random_range(-limit.y..=limit.y),
                );
            }
        }

        self.state = SceneState::Ready;
        self.remaining = 0;
        log::info!("scene ready with {} entities", self.entities.len());
        Ok(())
    }

    /// Frees every entity and returns to an empty loading state.
    pub fn clear_state<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<(), SceneError> {
        if self.state == SceneState::Disposed {
            return Err(SceneError::Disposed);
        }
        self.release_entities(resources);
        self.state = SceneState::Loading;
        self.expected = 0;
        self.remaining = 0;
        self.placeholder = Entity::placeholder();
        self.refresh_placeholder();
        log::debug!("scene cleared");
        Ok(())
    }

    // ── viewport ──────────────────────────────────────────────────────────

    /// See [`ViewportState::set_zoom`].
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        let changed = self.viewport.set_zoom(zoom);
        if changed {
            self.refresh_placeholder();
        }
        changed
    }

    pub fn zoom_by(&mut self, delta: f32) -> bool {
        self.set_zoom(self.viewport.zoom() + delta)
    }

    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.viewport.set_size(width, height);
        self.refresh_placeholder();
    }

    // ── frames ────────────────────────────────────────────────────────────

    /// Asks the next [`render_frame`](Self::render_frame) to read back its result.
    pub fn request_capture(&mut self) {
        if self.state != SceneState::Disposed {
            self.capture_requested = true;
        }
    }

    /// Draws one frame. Returns the captured pixels when a capture was
    /// requested.
    ///
    /// Loading frames draw only the placeholder. Ready frames upload pending
    /// textures and then draw every drawable entity in paint order.
    pub fn render_frame<R: GeometryResources + ?Sized>(
        &mut self,
        resources: &mut R,
        dt: f32,
    ) -> Result<Option<PixelBuffer>, GpuError> {
        if self.state == SceneState::Disposed {
            return Ok(None);
        }

        self.bar.advance(dt);
        self.refresh_placeholder();

        let ready = self.state == SceneState::Ready;
        if ready {
            self.upload_pending(resources);
        }

        let capture = self.capture_requested;
        let kind = if capture { FrameKind::Capture } else { FrameKind::Present };
        let world = *self.viewport.world_matrix();
        {
            let mut frame = Bound::new(resources, kind)?;
            if ready {
                for id in self.order.iter() {
                    if let Some(e) = self.entities.get(&id).filter(|e| e.is_drawable()) {
                        frame.draw(&world, &e.model(), e.texture());
                    }
                }
            } else if self.placeholder.visible {
                frame.draw(&world, &self.placeholder.model(), None);
            }
        }
        self.capture_requested = false;

        if capture {
            self.capture_frame(resources).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads back the frame just drawn as top-down RGBA of exactly the
    /// surface size.
    pub fn capture_frame<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) -> Result<PixelBuffer, GpuError> {
        if self.state == SceneState::Disposed {
            return Err(GpuError::NotInitialized);
        }
        let (width, height) = resources.size();
        if width == 0 || height == 0 {
            return Ok(PixelBuffer::new(width, height));
        }
        capture::normalize(resources.read_pixels()?)
    }

    /// Frees every entity texture and the geometry resources. Terminal and
    /// idempotent.
    pub fn dispose<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        if self.state == SceneState::Disposed {
            return;
        }
        self.release_entities(resources);
        resources.destroy();
        self.state = SceneState::Disposed;
        self.capture_requested = false;
        log::info!("scene disposed");
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Uploads every pending image. An entity whose upload fails can never
    /// be drawn, so it leaves the scene.
    fn upload_pending<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        let mut failed = Vec::new();
        for (id, e) in self.entities.iter_mut().filter(|(_, e)| e.needs_upload()) {
            if let Err(err) = e.upload(resources) {
                log::error!("{id} dropped: {err}");
                failed.push(*id);
            }
        }
        for id in failed {
            self.entities.remove(&id);
            self.order.remove(id);
        }
    }

    fn release_entities<R: GeometryResources + ?Sized>(&mut self, resources: &mut R) {
        for e in self.entities.values_mut() {
            e.release(resources);
        }
        self.entities.clear();
        self.order.clear();
    }

    fn refresh_placeholder(&mut self) {
        let fraction = if self.expected == 0 {
            1.0
        } else {
            self.remaining as f32 / self.expected as f32
        };
        let (position, scale) = self.bar.layout(&self.viewport, fraction);
        self.placeholder.position = position;
        self.placeholder.scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{FatalError, RawPixels, SoftwareResources, TextureId};
    use glam::Mat4;
    use image::{Rgba, RgbaImage};

    fn seeded() -> Scene {
        Scene::new(SceneConfig { seed: Some(7), ..Default::default() })
    }

    fn ready_with(positions: &[(f32, f32)]) -> (Scene, Vec<EntityId>) {
        let mut s = seeded();
        s.begin_loading(positions.len()).unwrap();
        let ids: Vec<_> = positions
            .iter()
            .map(|_| s.add_entity(RgbaImage::new(1, 1)).unwrap())
            .collect();
        s.transition_to_ready().unwrap();
        for (id, (x, y)) in ids.iter().zip(positions) {
            s.set_entity_position(*id, Vec2::new(*x, *y)).unwrap();
        }
        (s, ids)
    }

    fn resources(w: u32, h: u32) -> SoftwareResources {
        let mut r = SoftwareResources::default();
        r.resize(w, h);
        r
    }

    // ── hit testing and order ─────────────────────────────────────────────

    #[test]
    fn hit_test_unit_box() {
        let (s, ids) = ready_with(&[(0.0, 0.0)]);
        assert_eq!(s.hit_test(Vec2::new(0.5, 0.5)), Some(ids[0]));
        assert_eq!(s.hit_test(Vec2::new(1.5, 1.5)), None);
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let (mut s, ids) = ready_with(&[(0.0, 0.0), (0.25, 0.25)]);
        assert_eq!(s.hit_test(Vec2::new(0.5, 0.5)), Some(ids[1]));
        s.promote_to_top(ids[0]);
        assert_eq!(s.hit_test(Vec2::new(0.5, 0.5)), Some(ids[0]));
    }

    #[test]
    fn hit_test_skips_hidden() {
        let (mut s, ids) = ready_with(&[(0.0, 0.0)]);
        s.entities.get_mut(&ids[0]).unwrap().visible = false;
        assert_eq!(s.hit_test(Vec2::new(0.5, 0.5)), None);
    }

    #[test]
    fn loading_disables_interaction() {
        let mut s = seeded();
        s.begin_loading(2).unwrap();
        let a = s.add_entity(RgbaImage::new(1, 1)).unwrap();
        let b = s.add_entity(RgbaImage::new(1, 1)).unwrap();
        s.set_entity_position(a, Vec2::zero()).unwrap();
        assert_eq!(s.hit_test(Vec2::new(0.5, 0.5)), None);
        assert!(!s.promote_to_top(a));
        assert_eq!(s.draw_order(), [a, b]);
    }

    #[test]
    fn promote_keeps_size() {
        let (mut s, ids) = ready_with(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        assert!(s.promote_to_top(ids[2]));
        assert_eq!(s.draw_order(), [ids[0], ids[1], ids[2]]);
        assert!(s.promote_to_top(ids[0]));
        assert_eq!(s.draw_order(), [ids[1], ids[2], ids[0]]);
        assert_eq!(s.draw_order().len(), s.len());
    }

    #[test]
    fn drag_accumulates_exactly() {
        let (mut s, ids) = ready_with(&[(0.0, 0.0)]);
        s.move_entity_by(ids[0], Vec2::new(1.0, 1.0)).unwrap();
        s.move_entity_by(ids[0], Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(s.entity(ids[0]).unwrap().position, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn unknown_entity_is_reported() {
        let mut s = seeded();
        let err = s.move_entity_by(EntityId(42), Vec2::zero()).unwrap_err();
        assert_eq!(err, SceneError::UnknownEntity(EntityId(42)));
    }

    // ── state machine ─────────────────────────────────────────────────────

    #[test]
    fn ready_scatters_within_spread() {
        let mut s = seeded();
        s.set_surface_size(200, 100);
        s.begin_loading(20).unwrap();
        for _ in 0..20 {
            s.add_entity(RgbaImage::new(1, 1)).unwrap();
        }
        s.transition_to_ready().unwrap();

        let limit = s.viewport().visible_limit() * 0.75;
        for id in s.draw_order() {
            let p = s.entity(*id).unwrap().position;
            assert!(p.x.abs() <= limit.x && p.y.abs() <= limit.y, "{p:?}");
        }
    }

    #[test]
    fn second_ready_is_rejected_without_rerandomizing() {
        let (mut s, ids) = ready_with(&[(0.0, 0.0), (1.0, 1.0)]);
        let before: Vec<_> = ids.iter().map(|id| s.entity(*id).unwrap().position).collect();
        assert_eq!(
            s.transition_to_ready(),
            Err(SceneError::InvalidTransition { from: SceneState::Ready })
        );
        let after: Vec<_> = ids.iter().map(|id| s.entity(*id).unwrap().position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn same_seed_same_layout() {
        let place = || {
            let mut s = seeded();
            s.begin_loading(3).unwrap();
            for _ in 0..3 {
                s.add_entity(RgbaImage::new(2, 1)).unwrap();
            }
            s.transition_to_ready().unwrap();
            s.draw_order().iter().map(|id| s.entity(*id).unwrap().position).collect::<Vec<_>>()
        };
        assert_eq!(place(), place());
    }

    #[test]
    fn clear_state_frees_textures_and_restarts() {
        let mut res = resources(8, 8);
        let mut s = seeded();
        s.initialize(&mut res).unwrap();
        s.begin_loading(1).unwrap();
        s.add_entity(RgbaImage::new(1, 1)).unwrap();
        s.transition_to_ready().unwrap();
        s.render_frame(&mut res, 0.016).unwrap();
        assert_eq!(res.texture_count(), 1);

        s.clear_state(&mut res).unwrap();
        assert_eq!(res.texture_count(), 0);
        assert!(s.is_empty());
        assert!(s.draw_order().is_empty());
        assert_eq!(s.state(), SceneState::Loading);
        assert!(s.transition_to_ready().is_ok());
    }

    #[test]
    fn disposed_is_terminal() {
        let mut res = resources(4, 4);
        let mut s = seeded();
        s.initialize(&mut res).unwrap();
        s.dispose(&mut res);
        s.dispose(&mut res);
        assert_eq!(s.state(), SceneState::Disposed);
        assert_eq!(s.add_entity(RgbaImage::new(1, 1)), Err(SceneError::Disposed));
        assert_eq!(s.begin_loading(1), Err(SceneError::Disposed));
        assert_eq!(s.transition_to_ready(), Err(SceneError::Disposed));
        s.request_capture();
        assert_eq!(s.render_frame(&mut res, 0.016), Ok(None));
        assert!(!res.is_initialized());
    }

    #[test]
    fn progress_is_clamped() {
        let mut s = seeded();
        s.begin_loading(3).unwrap();
        s.report_progress(1);
        assert_eq!(s.progress(), (1, 3));
        s.report_progress(9);
        assert_eq!(s.progress(), (3, 3));
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn zoom_rescales_placeholder() {
        let mut s = seeded();
        let before = s.placeholder().scale;
        assert!(s.set_zoom(6.0));
        assert!((s.placeholder().scale.x - before.x * 2.0).abs() < 1e-5);
        assert!(!s.set_zoom(12.0));
        assert_eq!(s.viewport().zoom(), 6.0);
    }

    #[test]
    fn loading_frame_draws_only_placeholder() {
        let mut res = resources(16, 16);
        let mut s = seeded();
        s.initialize(&mut res).unwrap();
        s.set_surface_size(16, 16);
        s.begin_loading(2).unwrap();
        s.add_entity(RgbaImage::new(1, 1)).unwrap();

        s.render_frame(&mut res, 0.0).unwrap();
        assert_eq!(res.frame_draws(), 1);
        assert_eq!(res.texture_count(), 0);
    }

    #[test]
    fn capture_has_surface_size() {
        for (w, h, zoom) in [(32, 16, 1.0), (7, 5, 10.0), (1, 1, 3.0)] {
            let mut res = resources(w, h);
            let mut s = seeded();
            s.initialize(&mut res).unwrap();
            s.set_surface_size(w, h);
            s.set_zoom(zoom);
            s.begin_loading(0).unwrap();
            s.transition_to_ready().unwrap();
            s.request_capture();
            let img = s.render_frame(&mut res, 0.016).unwrap().unwrap();
            assert_eq!(img.dimensions(), (w, h));
            assert!(!s.capture_requested());
        }
    }

    #[test]
    fn capture_shows_entity_right_side_up() {
        let mut res = resources(20, 20);
        let mut s = Scene::new(SceneConfig { initial_zoom: 1.0, seed: Some(1), ..Default::default() });
        s.initialize(&mut res).unwrap();
        s.set_surface_size(20, 20);
        s.begin_loading(1).unwrap();

        // Red top row, blue bottom row.
        let mut img = RgbaImage::from_pixel(1, 2, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let id = s.add_entity(img).unwrap();
        s.transition_to_ready().unwrap();
        s.set_entity_position(id, Vec2::new(-1.0, -1.0)).unwrap();
        s.set_entity_scale(id, Vec2::new(2.0, 2.0)).unwrap();

        s.request_capture();
        let out = s.render_frame(&mut res, 0.016).unwrap().unwrap();
        assert_eq!(out.get_pixel(10, 2).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(10, 17).0, [0, 0, 255, 255]);
    }

    #[test]
    fn entity_without_texture_never_drawn() {
        let mut res = resources(8, 8);
        let mut s = seeded();
        s.initialize(&mut res).unwrap();
        s.set_surface_size(8, 8);
        s.begin_loading(1).unwrap();
        let id = s.add_entity(RgbaImage::new(0, 0)).unwrap();
        s.transition_to_ready().unwrap();
        s.set_entity_position(id, Vec2::new(-3.0, -3.0)).unwrap();
        s.set_entity_scale(id, Vec2::new(6.0, 6.0)).unwrap();

        s.request_capture();
        let out = s.render_frame(&mut res, 0.016).unwrap().unwrap();
        let clear = crate::render::ResourceConfig::default().clear_color.to_rgba8();
        assert!(out.pixels().all(|p| p.0 == clear));
        assert_eq!(res.frame_draws(), 0);
    }

    #[test]
    fn render_before_initialize_fails() {
        let mut res = resources(4, 4);
        let mut s = seeded();
        assert_eq!(s.render_frame(&mut res, 0.016), Err(GpuError::NotInitialized));
    }

    #[test]
    fn failed_upload_leaves_scene() {
        let mut res = resources(8, 8);
        let mut s = seeded();
        s.initialize(&mut res).unwrap();
        s.set_surface_size(8, 8);
        s.begin_loading(2).unwrap();
        let huge = s.add_entity(RgbaImage::new(9000, 1)).unwrap();
        let small = s.add_entity(RgbaImage::new(1, 1)).unwrap();
        s.transition_to_ready().unwrap();
        s.set_entity_position(huge, Vec2::new(-1.0, -0.5)).unwrap();
        s.set_entity_position(small, Vec2::new(2.0, 2.0)).unwrap();

        s.render_frame(&mut res, 0.016).unwrap();
        assert_eq!(s.hit_test(Vec2::new(0.0, 0.0)), None);
        assert!(s.entity(huge).is_none());
        assert_eq!(s.draw_order(), &[small]);
        assert_eq!(s.len(), 1);
        assert_eq!(res.frame_draws(), 1);
        assert_eq!(s.move_entity_by(huge, Vec2::splat(1.0)), Err(SceneError::UnknownEntity(huge)));
    }

    // ── fatal initialization ──────────────────────────────────────────────

    /// Fails `initialize` and counts every call that reaches it afterwards.
    #[derive(Default)]
    struct BrokenDevice {
        destroyed: usize,
        calls_after_init: usize,
    }

    impl GeometryResources for BrokenDevice {
        fn initialize(&mut self) -> Result<(), FatalError> {
            Err(FatalError::ShaderCompile("missing entry point".into()))
        }
        fn is_initialized(&self) -> bool {
            false
        }
        fn resize(&mut self, _: u32, _: u32) {
            self.calls_after_init += 1;
        }
        fn size(&self) -> (u32, u32) {
            (4, 4)
        }
        fn create_texture(&mut self, _: &RgbaImage) -> Result<TextureId, GpuError> {
            self.calls_after_init += 1;
            Err(GpuError::NotInitialized)
        }
        fn destroy_texture(&mut self, _: TextureId) {
            self.calls_after_init += 1;
        }
        fn bind(&mut self, _: FrameKind) -> Result<(), GpuError> {
            self.calls_after_init += 1;
            Err(GpuError::NotInitialized)
        }
        fn draw(&mut self, _: &Mat4, _: &Mat4, _: Option<TextureId>) {
            self.calls_after_init += 1;
        }
        fn unbind(&mut self) {
            self.calls_after_init += 1;
        }
        fn read_pixels(&mut self) -> Result<RawPixels, GpuError> {
            self.calls_after_init += 1;
            Err(GpuError::NotInitialized)
        }
        fn destroy(&mut self) {
            self.destroyed += 1;
        }
    }

    #[test]
    fn fatal_initialize_disposes_once() {
        let mut dev = BrokenDevice::default();
        let mut s = seeded();
        s.begin_loading(1).unwrap();
        s.add_entity(RgbaImage::new(2, 2)).unwrap();

        let err = s.initialize(&mut dev).unwrap_err();
        assert_eq!(err, SceneError::Fatal(FatalError::ShaderCompile("missing entry point".into())));
        assert_eq!(s.state(), SceneState::Disposed);
        assert_eq!(dev.destroyed, 1);
        assert_eq!(s.len(), 0);

        s.request_capture();
        assert_eq!(s.render_frame(&mut dev, 0.016), Ok(None));
        assert_eq!(s.capture_frame(&mut dev), Err(GpuError::NotInitialized));
        s.dispose(&mut dev);
        assert_eq!(s.initialize(&mut dev), Err(SceneError::Disposed));
        assert_eq!(dev.calls_after_init, 0);
        assert_eq!(dev.destroyed, 1);
    }
}
