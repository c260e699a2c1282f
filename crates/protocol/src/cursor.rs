use bytes::{Buf, Bytes};

use crate::ProtocolError;

/// Fail with [`ProtocolError::Truncated`] unless `buf` holds `needed` more bytes.
pub(crate) fn ensure(buf: &Bytes, needed: usize, what: &'static str) -> Result<(), ProtocolError> {
    if buf.remaining() < needed {
        return Err(ProtocolError::Truncated {
            what,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// Read a signed 32-bit field that must not be negative.
pub(crate) fn read_count(buf: &mut Bytes, what: &'static str) -> Result<u32, ProtocolError> {
    ensure(buf, 4, what)?;
    let value = buf.get_i32_le();
    u32::try_from(value).map_err(|_| ProtocolError::Negative { what, value })
}

/// Split `count * stride` bytes off the front of `buf` without copying.
pub(crate) fn take_elements(
    buf: &mut Bytes,
    count: u32,
    stride: usize,
    what: &'static str,
) -> Result<Bytes, ProtocolError> {
    let len = (count as usize)
        .checked_mul(stride)
        .ok_or(ProtocolError::Overflow { what })?;
    ensure(buf, len, what)?;
    Ok(buf.split_to(len))
}
