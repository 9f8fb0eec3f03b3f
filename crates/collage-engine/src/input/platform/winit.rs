use ::winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use ::winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{CanvasInput, PointerState, ZoomDirection};

/// Translates a winit `WindowEvent` into a canvas input.
///
/// Cursor positions stay in physical pixels, matching the surface size the
/// viewport converts from. Returns `None` for events the canvas ignores.
pub fn translate_window_event(pointer: &mut PointerState, event: &WindowEvent) -> Option<CanvasInput> {
    match event {
        WindowEvent::CursorMoved { position, .. } => pointer
            .moved(position.x as f32, position.y as f32)
            .map(CanvasInput::Touch),

        WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
            let touch = match state {
                ElementState::Pressed => pointer.press(),
                ElementState::Released => pointer.release(),
            };
            touch.map(CanvasInput::Touch)
        }

        // A drag never outlives the pointer.
        WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
            pointer.release().map(CanvasInput::Touch)
        }

        WindowEvent::MouseWheel { delta, .. } => map_wheel(*delta).map(CanvasInput::Zoom),

        WindowEvent::KeyboardInput { event, .. } => {
            if event.state != ElementState::Pressed || event.repeat {
                return None;
            }
            match event.physical_key {
                PhysicalKey::Code(code) => map_key(code),
                PhysicalKey::Unidentified(_) => None,
            }
        }

        _ => None,
    }
}

fn map_wheel(delta: MouseScrollDelta) -> Option<ZoomDirection> {
    let y = match delta {
        MouseScrollDelta::LineDelta(_, y) => y as f64,
        MouseScrollDelta::PixelDelta(p) => p.y,
    };
    if y > 0.0 {
        Some(ZoomDirection::In)
    } else if y < 0.0 {
        Some(ZoomDirection::Out)
    } else {
        None
    }
}

fn map_key(code: KeyCode) -> Option<CanvasInput> {
    match code {
        KeyCode::Equal | KeyCode::NumpadAdd => Some(CanvasInput::Zoom(ZoomDirection::In)),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(CanvasInput::Zoom(ZoomDirection::Out)),
        KeyCode::KeyC => Some(CanvasInput::Capture),
        KeyCode::KeyR => Some(CanvasInput::Reload),
        KeyCode::Escape => Some(CanvasInput::Close),
        _ => None,
    }
}
