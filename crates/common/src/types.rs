use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Size in bytes of one vertex record: position, normal, colour.
pub const VERTEX_STRIDE: usize = std::mem::size_of::<Vertex>();

/// Size in bytes of one index word.
pub const INDEX_STRIDE: usize = std::mem::size_of::<u32>();

/// One vertex as laid out on the wire and in the GPU vertex buffer.
///
/// The scene buffer never addresses vertices individually; this type exists
/// for building meshes (tests, tools) and for describing the GPU layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// RGBA, normalized by the renderer.
    pub colour: [u8; 4],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, colour: [u8; 4]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            colour,
        }
    }

    /// Byte offset of the normal within a vertex record.
    pub const NORMAL_OFFSET: usize = 12;
    /// Byte offset of the colour within a vertex record.
    pub const COLOUR_OFFSET: usize = 24;
}
