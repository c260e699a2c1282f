use bytes::{Buf, BufMut, Bytes, BytesMut};
use remoteview_common::{INDEX_STRIDE, VERTEX_STRIDE, Vertex};

use crate::cursor::{ensure, read_count, take_elements};
use crate::{HEADER_LEN, MessageHeader, ProtocolError, Timestamps};

/// Number of floats in a matrix payload.
pub const MATRIX_LEN: usize = 16;

/// Inbound message kinds.
///
/// Projection travels as its own kind (2). The protocol variant that folds
/// projection into client-side computation is not supported.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    FullMesh = 0,
    ViewMatrix = 1,
    ProjMatrix = 2,
    RegionPatch = 3,
}

impl TryFrom<i32> for MessageKind {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FullMesh),
            1 => Ok(Self::ViewMatrix),
            2 => Ok(Self::ProjMatrix),
            3 => Ok(Self::RegionPatch),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// Vertex and index bytes carried by a mesh message.
///
/// Both regions are slices of the received frame. Their lengths are always
/// whole multiples of the vertex and index strides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshData {
    vertices: Bytes,
    indices: Bytes,
}

impl MeshData {
    pub fn new(vertices: Bytes, indices: Bytes) -> Result<Self, ProtocolError> {
        if vertices.len() % VERTEX_STRIDE != 0 {
            return Err(ProtocolError::Misaligned {
                what: "vertex data",
                len: vertices.len(),
                stride: VERTEX_STRIDE,
            });
        }
        if indices.len() % INDEX_STRIDE != 0 {
            return Err(ProtocolError::Misaligned {
                what: "index data",
                len: indices.len(),
                stride: INDEX_STRIDE,
            });
        }
        Ok(Self { vertices, indices })
    }

    /// Build mesh data from typed vertices and indices, little-endian.
    pub fn from_parts(vertices: &[Vertex], indices: &[u32]) -> Self {
        let mut vbuf = BytesMut::with_capacity(vertices.len() * VERTEX_STRIDE);
        for v in vertices {
            for f in v.position.iter().chain(v.normal.iter()) {
                vbuf.put_f32_le(*f);
            }
            vbuf.put_slice(&v.colour);
        }
        let mut ibuf = BytesMut::with_capacity(indices.len() * INDEX_STRIDE);
        for i in indices {
            ibuf.put_u32_le(*i);
        }
        Self {
            vertices: vbuf.freeze(),
            indices: ibuf.freeze(),
        }
    }

    pub fn vertices(&self) -> &Bytes {
        &self.vertices
    }

    pub fn indices(&self) -> &Bytes {
        &self.indices
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len() / VERTEX_STRIDE) as u32
    }

    pub fn index_count(&self) -> u32 {
        (self.indices.len() / INDEX_STRIDE) as u32
    }

    /// Split into the vertex and index regions.
    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.vertices, self.indices)
    }

    /// Iterate the index words.
    pub fn index_words(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices
            .chunks_exact(INDEX_STRIDE)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    fn decode(buf: &mut Bytes, vertex_count: u32, index_count: u32) -> Result<Self, ProtocolError> {
        let vertices = take_elements(buf, vertex_count, VERTEX_STRIDE, "vertex data")?;
        let indices = take_elements(buf, index_count, INDEX_STRIDE, "index data")?;
        Ok(Self { vertices, indices })
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Replace vertex and/or index data wholesale.
    FullMesh(MeshData),
    /// Replace the view matrix (column-major).
    ViewMatrix([f32; MATRIX_LEN]),
    /// Replace the projection matrix (column-major).
    ProjMatrix([f32; MATRIX_LEN]),
    /// Overwrite a sub-range of the existing vertex/index data.
    /// Offsets are in elements (vertices, index words).
    RegionPatch {
        vertex_offset: u32,
        index_offset: u32,
        mesh: MeshData,
    },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::FullMesh(_) => MessageKind::FullMesh,
            Message::ViewMatrix(_) => MessageKind::ViewMatrix,
            Message::ProjMatrix(_) => MessageKind::ProjMatrix,
            Message::RegionPatch { .. } => MessageKind::RegionPatch,
        }
    }

    /// Decode the payload that follows a header of the given kind.
    ///
    /// Nothing is returned unless the whole payload is present, so a caller
    /// never sees a partially decoded message.
    pub fn decode(kind: MessageKind, buf: &mut Bytes) -> Result<Self, ProtocolError> {
        match kind {
            MessageKind::FullMesh => {
                ensure(buf, 8, "mesh counts")?;
                let vertex_count = read_count(buf, "vertex count")?;
                let index_count = read_count(buf, "index count")?;
                Ok(Message::FullMesh(MeshData::decode(
                    buf,
                    vertex_count,
                    index_count,
                )?))
            }
            MessageKind::ViewMatrix => Ok(Message::ViewMatrix(decode_matrix(buf)?)),
            MessageKind::ProjMatrix => Ok(Message::ProjMatrix(decode_matrix(buf)?)),
            MessageKind::RegionPatch => {
                ensure(buf, 16, "region header")?;
                let vertex_offset = read_count(buf, "vertex offset")?;
                let vertex_count = read_count(buf, "vertex count")?;
                let index_offset = read_count(buf, "index offset")?;
                let index_count = read_count(buf, "index count")?;
                let mesh = MeshData::decode(buf, vertex_count, index_count)?;
                Ok(Message::RegionPatch {
                    vertex_offset,
                    index_offset,
                    mesh,
                })
            }
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Message::FullMesh(mesh) => 8 + mesh.vertices.len() + mesh.indices.len(),
            Message::ViewMatrix(_) | Message::ProjMatrix(_) => MATRIX_LEN * 4,
            Message::RegionPatch { mesh, .. } => 16 + mesh.vertices.len() + mesh.indices.len(),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        match self {
            Message::FullMesh(mesh) => {
                buf.put_i32_le(mesh.vertex_count() as i32);
                buf.put_i32_le(mesh.index_count() as i32);
                buf.put_slice(&mesh.vertices);
                buf.put_slice(&mesh.indices);
            }
            Message::ViewMatrix(m) | Message::ProjMatrix(m) => {
                for f in m {
                    buf.put_f32_le(*f);
                }
            }
            Message::RegionPatch {
                vertex_offset,
                index_offset,
                mesh,
            } => {
                buf.put_i32_le(*vertex_offset as i32);
                buf.put_i32_le(mesh.vertex_count() as i32);
                buf.put_i32_le(*index_offset as i32);
                buf.put_i32_le(mesh.index_count() as i32);
                buf.put_slice(&mesh.vertices);
                buf.put_slice(&mesh.indices);
            }
        }
    }
}

fn decode_matrix(buf: &mut Bytes) -> Result<[f32; MATRIX_LEN], ProtocolError> {
    ensure(buf, MATRIX_LEN * 4, "matrix")?;
    let mut m = [0.0f32; MATRIX_LEN];
    for slot in &mut m {
        *slot = buf.get_f32_le();
    }
    Ok(m)
}

/// One complete inbound frame: header timestamps plus a decoded message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub timestamps: Timestamps,
    pub message: Message,
}

impl Frame {
    pub fn new(timestamps: Timestamps, message: Message) -> Self {
        Self {
            timestamps,
            message,
        }
    }

    /// Decode a whole frame. Trailing bytes after the payload are ignored.
    pub fn decode(mut buf: Bytes) -> Result<Self, ProtocolError> {
        let header = MessageHeader::decode(&mut buf)?;
        let kind = MessageKind::try_from(header.kind)?;
        let message = Message::decode(kind, &mut buf)?;
        if !buf.is_empty() {
            tracing::trace!(?kind, trailing = buf.len(), "ignoring trailing bytes");
        }
        Ok(Self {
            timestamps: header.timestamps,
            message,
        })
    }

    /// Encode in the server → client direction.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.message.encoded_len());
        MessageHeader {
            kind: self.message.kind() as i32,
            timestamps: self.timestamps,
        }
        .encode(&mut buf);
        self.message.encode(&mut buf);
        buf.freeze()
    }
}
