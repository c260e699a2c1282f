use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;
use crate::cursor::ensure;

/// Size of the header that precedes every inbound frame.
///
/// ```text
/// [i32 kind][i32 pad][u64 client_send_echo][u64 server_recv][u64 server_send]
/// ```
pub const HEADER_LEN: usize = 24;

/// The three latency timestamps carried by every inbound frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    /// The client's last input timestamp, echoed back by the server.
    pub client_send_echo: u64,
    /// When the server received that input.
    pub server_recv: u64,
    /// When the server sent this frame.
    pub server_send: u64,
}

/// Decoded frame header. `kind` is kept raw so that latency can still be
/// accounted for frames whose kind is not understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub kind: i32,
    pub timestamps: Timestamps,
}

impl MessageHeader {
    /// Consume [`HEADER_LEN`] bytes from the front of `buf`.
    pub fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        ensure(buf, HEADER_LEN, "header")?;
        let kind = buf.get_i32_le();
        let _pad = buf.get_i32_le();
        let timestamps = Timestamps {
            client_send_echo: buf.get_u64_le(),
            server_recv: buf.get_u64_le(),
            server_send: buf.get_u64_le(),
        };
        Ok(Self { kind, timestamps })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.kind);
        buf.put_i32_le(0);
        buf.put_u64_le(self.timestamps.client_send_echo);
        buf.put_u64_le(self.timestamps.server_recv);
        buf.put_u64_le(self.timestamps.server_send);
    }
}
