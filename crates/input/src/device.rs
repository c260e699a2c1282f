/// A local input occurrence, as produced by whatever windowing layer is in use.
///
/// Coordinates are window-relative pixels. The encoder saturates them to the
/// 16-bit range of the wire format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceInput {
    /// Keyboard key press or release. `keycode` is a DOM-style virtual key code.
    Key { keycode: u32, pressed: bool },
    /// Mouse button press or release. `button` is the system button index
    /// (0 = left, 1 = middle, 2 = right).
    MouseButton {
        button: u32,
        x: i32,
        y: i32,
        pressed: bool,
    },
    /// Cursor moved.
    MouseMove { x: i32, y: i32 },
    /// Vertical scroll. Positive `delta_y` scrolls down.
    Wheel { delta_y: f32 },
}
