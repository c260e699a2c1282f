//! winit events to device input.

use remoteview_input::DeviceInput;
use winit::event::{MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

/// Pixels per wheel notch when the platform reports lines.
const LINE_HEIGHT: f32 = 100.0;

/// DOM virtual key code for a physical key, if it has one the server knows.
pub fn dom_keycode(key: KeyCode) -> Option<u32> {
    use KeyCode::*;

    let code = match key {
        Backspace => 8,
        Tab => 9,
        Enter | NumpadEnter => 13,
        ShiftLeft | ShiftRight => 16,
        ControlLeft | ControlRight => 17,
        AltLeft | AltRight => 18,
        Pause => 19,
        CapsLock => 20,
        Escape => 27,
        Space => 32,
        PageUp => 33,
        PageDown => 34,
        End => 35,
        Home => 36,
        ArrowLeft => 37,
        ArrowUp => 38,
        ArrowRight => 39,
        ArrowDown => 40,
        Insert => 45,
        Delete => 46,
        Digit0 => 48,
        Digit1 => 49,
        Digit2 => 50,
        Digit3 => 51,
        Digit4 => 52,
        Digit5 => 53,
        Digit6 => 54,
        Digit7 => 55,
        Digit8 => 56,
        Digit9 => 57,
        KeyA => 65,
        KeyB => 66,
        KeyC => 67,
        KeyD => 68,
        KeyE => 69,
        KeyF => 70,
        KeyG => 71,
        KeyH => 72,
        KeyI => 73,
        KeyJ => 74,
        KeyK => 75,
        KeyL => 76,
        KeyM => 77,
        KeyN => 78,
        KeyO => 79,
        KeyP => 80,
        KeyQ => 81,
        KeyR => 82,
        KeyS => 83,
        KeyT => 84,
        KeyU => 85,
        KeyV => 86,
        KeyW => 87,
        KeyX => 88,
        KeyY => 89,
        KeyZ => 90,
        SuperLeft => 91,
        SuperRight => 92,
        Numpad0 => 96,
        Numpad1 => 97,
        Numpad2 => 98,
        Numpad3 => 99,
        Numpad4 => 100,
        Numpad5 => 101,
        Numpad6 => 102,
        Numpad7 => 103,
        Numpad8 => 104,
        Numpad9 => 105,
        NumpadMultiply => 106,
        NumpadAdd => 107,
        NumpadSubtract => 109,
        NumpadDecimal => 110,
        NumpadDivide => 111,
        F1 => 112,
        F2 => 113,
        F3 => 114,
        F4 => 115,
        F5 => 116,
        F6 => 117,
        F7 => 118,
        F8 => 119,
        F9 => 120,
        F10 => 121,
        F11 => 122,
        F12 => 123,
        Semicolon => 186,
        Equal => 187,
        Comma => 188,
        Minus => 189,
        Period => 190,
        Slash => 191,
        Backquote => 192,
        BracketLeft => 219,
        Backslash => 220,
        BracketRight => 221,
        Quote => 222,
        _ => return None,
    };
    Some(code)
}

/// System button index: 0 left, 1 middle, 2 right, then back/forward.
pub fn button_index(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(n) => u32::from(n),
    }
}

/// Vertical scroll in DOM convention, where positive scrolls down.
pub fn wheel(delta: MouseScrollDelta) -> DeviceInput {
    let delta_y = match delta {
        MouseScrollDelta::LineDelta(_, lines) => -lines * LINE_HEIGHT,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    };
    DeviceInput::Wheel { delta_y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn letters_and_digits_use_ascii_codes() {
        assert_eq!(dom_keycode(KeyCode::KeyA), Some(65));
        assert_eq!(dom_keycode(KeyCode::KeyZ), Some(90));
        assert_eq!(dom_keycode(KeyCode::Digit0), Some(48));
        assert_eq!(dom_keycode(KeyCode::Space), Some(32));
    }

    #[test]
    fn both_shift_keys_share_a_code() {
        assert_eq!(dom_keycode(KeyCode::ShiftLeft), Some(16));
        assert_eq!(dom_keycode(KeyCode::ShiftRight), Some(16));
    }

    #[test]
    fn unmapped_key() {
        assert_eq!(dom_keycode(KeyCode::F24), None);
    }

    #[test]
    fn buttons_use_system_order() {
        assert_eq!(button_index(MouseButton::Left), 0);
        assert_eq!(button_index(MouseButton::Middle), 1);
        assert_eq!(button_index(MouseButton::Right), 2);
        assert_eq!(button_index(MouseButton::Other(7)), 7);
    }

    #[test]
    fn wheel_up_is_negative() {
        assert_eq!(
            wheel(MouseScrollDelta::LineDelta(0.0, 1.0)),
            DeviceInput::Wheel { delta_y: -100.0 }
        );
        assert_eq!(
            wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -12.0))),
            DeviceInput::Wheel { delta_y: 12.0 }
        );
    }
}
