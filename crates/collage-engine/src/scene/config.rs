use crate::coords::DEFAULT_ZOOM;

/// Scene tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Zoom the viewport starts at.
    pub initial_zoom: f32,

    /// Fraction of the visible half-extent used when scattering entities on
    /// the transition to ready.
    pub spread: f32,

    /// Seed for placement. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            initial_zoom: DEFAULT_ZOOM,
            spread: 0.75,
            seed: None,
        }
    }
}
