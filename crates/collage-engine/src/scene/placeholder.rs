use std::f32::consts::TAU;

use crate::coords::{Vec2, ViewportState};

/// Height of the bar relative to the zoom.
const BAR_HEIGHT: f32 = 0.1;
/// Relative amplitude of the height pulse.
const PULSE_AMPLITUDE: f32 = 0.1;
/// Pulse frequency in Hz.
const PULSE_HZ: f32 = 1.0;

/// Loading bar geometry: a horizontal bar centred on the origin whose width
/// tracks the fraction of loads still pending.
#[derive(Debug, Clone, Default)]
pub struct LoadingBar {
    phase: f32,
}

impl LoadingBar {
    /// Advances the pulse by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.phase = (self.phase + dt * PULSE_HZ * TAU) % TAU;
        }
    }

    /// Returns `(position, scale)` for the placeholder quad.
    ///
    /// `fraction` is `remaining / expected`, clamped to `[0, 1]`.
    pub fn layout(&self, viewport: &ViewportState, fraction: f32) -> (Vec2, Vec2) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 1.0 };
        let zoom = viewport.zoom();

        let width = zoom * viewport.aspect_ratio() * fraction;
        let height = BAR_HEIGHT * zoom * (1.0 + PULSE_AMPLITUDE * self.phase.sin());

        (Vec2::new(-width * 0.5, -height * 0.5), Vec2::new(width, height))
    }
}
