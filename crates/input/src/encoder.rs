use remoteview_common::Timestamp;
use remoteview_protocol::{InputEvent, InputKind};

use crate::DeviceInput;

/// System mouse button → server button id. Middle and right are swapped.
const MOUSE_BUTTON_MAP: [(u32, u32); 3] = [(0, 0), (1, 2), (2, 1)];

/// Remap a system mouse button index. Buttons outside the table have no
/// server-side meaning and yield `None`.
pub fn remap_mouse_button(button: u32) -> Option<u32> {
    MOUSE_BUTTON_MAP
        .iter()
        .find(|(from, _)| *from == button)
        .map(|(_, to)| *to)
}

/// Builds wire input events from device input and remembers when the last
/// one was produced.
#[derive(Debug, Default)]
pub struct InputEncoder {
    last_sent: Option<Timestamp>,
    encoded: u64,
}

impl InputEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `input` to a wire event stamped with `timestamp`.
    ///
    /// Returns `None` for inputs that have no wire representation (unmapped
    /// mouse buttons).
    pub fn encode(&mut self, input: &DeviceInput, timestamp: Timestamp) -> Option<InputEvent> {
        let event = match *input {
            DeviceInput::Key { keycode, pressed } => InputEvent {
                keycode,
                down: pressed,
                ..InputEvent::new(InputKind::Key, timestamp)
            },
            DeviceInput::MouseButton {
                button,
                x,
                y,
                pressed,
            } => {
                let Some(keycode) = remap_mouse_button(button) else {
                    tracing::trace!(button, "ignoring unmapped mouse button");
                    return None;
                };
                InputEvent {
                    keycode,
                    x: saturate(x),
                    y: saturate(y),
                    down: pressed,
                    ..InputEvent::new(InputKind::MouseButton, timestamp)
                }
            }
            DeviceInput::MouseMove { x, y } => InputEvent {
                x: saturate(x),
                y: saturate(y),
                ..InputEvent::new(InputKind::MouseMove, timestamp)
            },
            DeviceInput::Wheel { delta_y } => InputEvent {
                y: saturate_f32(-delta_y),
                ..InputEvent::new(InputKind::Wheel, timestamp)
            },
        };
        self.last_sent = Some(timestamp);
        self.encoded += 1;
        Some(event)
    }

    /// Timestamp of the most recently encoded event.
    pub fn last_sent(&self) -> Option<Timestamp> {
        self.last_sent
    }

    pub fn encoded_count(&self) -> u64 {
        self.encoded
    }
}

fn saturate(v: i32) -> i16 {
    v.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn saturate_f32(v: f32) -> i16 {
    // `as` saturates and maps NaN to 0.
    v.round() as i16
}
