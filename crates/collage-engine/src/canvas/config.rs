use crate::render::ResourceConfig;
use crate::scene::SceneConfig;

/// Canvas configuration handed to [`CanvasRenderer::new`](super::CanvasRenderer::new).
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    pub scene: SceneConfig,

    /// Clear and placeholder colours.
    pub resources: ResourceConfig,

    /// Zoom change per zoom-in/zoom-out step.
    pub zoom_step: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            scene: SceneConfig::default(),
            resources: ResourceConfig::default(),
            zoom_step: 0.5,
        }
    }
}
