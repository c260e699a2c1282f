//! Input capture: local device events mapped to the fixed wire input event.
//!
//! # Invariants
//! - Mouse buttons are remapped through a fixed table before encoding.
//! - Wheel events carry only a sign-inverted vertical delta in `y`.
//! - Input is never queued: the session drops it unless the connection is open.

pub mod device;
mod encoder;

pub use device::DeviceInput;
pub use encoder::{InputEncoder, remap_mouse_button};

pub fn crate_info() -> &'static str {
    "remoteview-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
