use super::types::{TouchEvent, TouchPhase};

/// Mouse-as-finger state for one window.
///
/// Only the primary button drives touches; moves without a pressed button
/// just track the cursor.
#[derive(Debug, Default, Clone)]
pub struct PointerState {
    /// Last cursor position in physical pixels.
    pub position: Option<(f32, f32)>,
    pub pressed: bool,
}

impl PointerState {
    /// Records a cursor move. Emits a touch move while pressed.
    pub fn moved(&mut self, x: f32, y: f32) -> Option<TouchEvent> {
        self.position = Some((x, y));
        self.pressed.then(|| TouchEvent::moved(x, y))
    }

    /// Primary button pressed at the last known position.
    pub fn press(&mut self) -> Option<TouchEvent> {
        let (x, y) = self.position?;
        if self.pressed {
            return None;
        }
        self.pressed = true;
        Some(TouchEvent::down(x, y))
    }

    /// Primary button released. Also used when the cursor leaves the window
    /// or focus is lost, so a drag never sticks.
    pub fn release(&mut self) -> Option<TouchEvent> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        let (x, y) = self.position.unwrap_or((0.0, 0.0));
        Some(TouchEvent { phase: TouchPhase::Up, x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_needs_a_known_position() {
        let mut p = PointerState::default();
        assert_eq!(p.press(), None);
        p.moved(3.0, 4.0);
        assert_eq!(p.press(), Some(TouchEvent::down(3.0, 4.0)));
    }

    #[test]
    fn drag_sequence() {
        let mut p = PointerState::default();
        assert_eq!(p.moved(1.0, 1.0), None);
        p.press();
        assert_eq!(p.press(), None);
        assert_eq!(p.moved(5.0, 6.0), Some(TouchEvent::moved(5.0, 6.0)));
        assert_eq!(p.release(), Some(TouchEvent::up(5.0, 6.0)));
        assert_eq!(p.release(), None);
        assert_eq!(p.moved(7.0, 7.0), None);
    }
}
