use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick; 0 on the first tick after a reset.
    pub dt: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Per-loop frame clock driving animation (the loading pulse).
///
/// Delta time is capped so a stall (debugger, minimized window, on-demand
/// idle period) does not jump the animation.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max(Duration::from_millis(250))
    }

    pub fn with_max(dt_max: Duration) -> Self {
        Self { last: None, frame_index: 0, dt_max }
    }

    /// Forgets the previous tick. Call after idling in on-demand mode.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last).min(self.dt_max),
            None => Duration::ZERO,
        };
        self.last = Some(now);

        let ft = FrameTime { dt: dt.as_secs_f32(), frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
