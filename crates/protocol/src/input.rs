use crate::ProtocolError;

/// Size of an encoded input event.
///
/// ```text
/// [u64 timestamp][u32 keycode][i16 x][i16 y][u8 type][u8 down][6 bytes zero]
/// ```
pub const INPUT_EVENT_LEN: usize = 24;

/// Input event type tag.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Key = 0,
    MouseButton = 1,
    MouseMove = 2,
    Wheel = 3,
}

impl TryFrom<u8> for InputKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Key),
            1 => Ok(Self::MouseButton),
            2 => Ok(Self::MouseMove),
            3 => Ok(Self::Wheel),
            other => Err(ProtocolError::UnknownInputKind(other)),
        }
    }
}

/// A client → server input event. Fields a kind does not use stay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Wall-clock milliseconds when the event was produced.
    pub timestamp: u64,
    /// Key code for keys, remapped button id for mouse buttons.
    pub keycode: u32,
    pub x: i16,
    pub y: i16,
    pub kind: InputKind,
    pub down: bool,
}

impl InputEvent {
    /// An event of the given kind with every other field zeroed.
    pub fn new(kind: InputKind, timestamp: u64) -> Self {
        Self {
            timestamp,
            keycode: 0,
            x: 0,
            y: 0,
            kind,
            down: false,
        }
    }

    pub fn encode(&self) -> [u8; INPUT_EVENT_LEN] {
        let mut buf = [0u8; INPUT_EVENT_LEN];
        buf[0..8].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[8..12].copy_from_slice(&self.keycode.to_le_bytes());
        buf[12..14].copy_from_slice(&self.x.to_le_bytes());
        buf[14..16].copy_from_slice(&self.y.to_le_bytes());
        buf[16] = self.kind as u8;
        buf[17] = u8::from(self.down);
        buf
    }

    /// Decode an event. Mirrors [`InputEvent::encode`]; used by servers and tests.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let buf: &[u8; INPUT_EVENT_LEN] =
            buf.try_into().map_err(|_| ProtocolError::InputEventLength {
                expected: INPUT_EVENT_LEN,
                actual: buf.len(),
            })?;
        Ok(Self {
            timestamp: u64::from_le_bytes([
                buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
            ]),
            keycode: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            x: i16::from_le_bytes([buf[12], buf[13]]),
            y: i16::from_le_bytes([buf[14], buf[15]]),
            kind: InputKind::try_from(buf[16])?,
            down: buf[17] != 0,
        })
    }
}
