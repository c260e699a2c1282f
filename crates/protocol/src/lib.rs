//! Wire codec for the remote-render stream.
//!
//! Inbound frames (server → client) are a 24-byte header followed by a
//! kind-specific payload. Outbound traffic is either a short ASCII control
//! string or a fixed 24-byte input event. All scalars are little-endian.
//!
//! # Invariants
//! - Payload length is derived from counts inside the frame, never from a
//!   separate length field. The decoder checks the counts against the bytes
//!   available and consumes exactly that many.
//! - Decoding is zero-copy: payload regions are slices of the frame.
//! - Encoding an [`InputEvent`] always yields exactly [`INPUT_EVENT_LEN`] bytes.

mod control;
mod cursor;
mod error;
mod header;
mod input;
mod message;

pub use control::{Ack, SceneRequest};
pub use error::ProtocolError;
pub use header::{HEADER_LEN, MessageHeader, Timestamps};
pub use input::{INPUT_EVENT_LEN, InputEvent, InputKind};
pub use message::{Frame, MATRIX_LEN, Message, MessageKind, MeshData};

pub fn crate_info() -> &'static str {
    "remoteview-protocol v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("protocol"));
    }
}
