/// Errors from decoding wire data.
///
/// Every variant is a protocol error for a single frame: the frame is
/// discarded and the connection stays up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated {what}: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("unknown message kind {0}")]
    UnknownKind(i32),
    #[error("negative {what}: {value}")]
    Negative { what: &'static str, value: i32 },
    #[error("{what} byte length {len} is not a multiple of {stride}")]
    Misaligned {
        what: &'static str,
        len: usize,
        stride: usize,
    },
    #[error("{what} size overflows the address space")]
    Overflow { what: &'static str },
    #[error("input event must be {expected} bytes, got {actual}")]
    InputEventLength { expected: usize, actual: usize },
    #[error("unknown input event type {0}")]
    UnknownInputKind(u8),
}
