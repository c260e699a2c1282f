use std::fmt;

use bytes::Bytes;
use remoteview_common::{INDEX_STRIDE, VERTEX_STRIDE};

/// Which of the two scene regions an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Vertex,
    Index,
}

impl Region {
    /// Size in bytes of one element of this region.
    pub fn stride(self) -> usize {
        match self {
            Region::Vertex => VERTEX_STRIDE,
            Region::Index => INDEX_STRIDE,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Vertex => f.write_str("vertex"),
            Region::Index => f.write_str("index"),
        }
    }
}

/// Errors from scene buffer mutations. A failed operation changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("region patch received before any full mesh")]
    NoBuffer,
    #[error("{region} patch at {offset}+{count} exceeds region of {len} elements")]
    OutOfBounds {
        region: Region,
        offset: u32,
        count: u32,
        len: usize,
    },
    #[error("{region} data is {len} bytes, expected {expected}")]
    LengthMismatch {
        region: Region,
        len: usize,
        expected: usize,
    },
}

/// Queued updates beyond this collapse into whole-region replaces.
pub const MAX_PENDING_UPDATES: usize = 256;

/// A single change to the scene regions, in the order it was applied.
///
/// GPU backends drain these with [`SceneBuffer::take_updates`] and replay them
/// as buffer (re)creations or sub-range writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferUpdate {
    ReplaceVertices(Bytes),
    ReplaceIndices(Bytes),
    PatchVertices { byte_offset: usize, data: Bytes },
    PatchIndices { byte_offset: usize, data: Bytes },
}

impl BufferUpdate {
    pub fn region(&self) -> Region {
        match self {
            BufferUpdate::ReplaceVertices(_) | BufferUpdate::PatchVertices { .. } => Region::Vertex,
            BufferUpdate::ReplaceIndices(_) | BufferUpdate::PatchIndices { .. } => Region::Index,
        }
    }
}

/// Authoritative CPU mirror of the vertex and index regions.
///
/// Regions are created lazily by the first full replace that carries data
/// for them. They never shrink except through another full replace.
///
/// Updates are only queued when the buffer was built with
/// [`SceneBuffer::with_update_queue`].
#[derive(Debug, Default)]
pub struct SceneBuffer {
    vertices: Option<Vec<u8>>,
    indices: Option<Vec<u8>>,
    index_count: u32,
    /// Set by the first full replace; patches are rejected until then.
    initialized: bool,
    revision: u64,
    queue_updates: bool,
    pending: Vec<BufferUpdate>,
}

impl SceneBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that records every accepted mutation for a GPU mirror.
    ///
    /// The queue holds at most [`MAX_PENDING_UPDATES`] entries. Past that it
    /// is collapsed into one replace per allocated region, so a consumer that
    /// drains late still ends up with the current contents.
    pub fn with_update_queue() -> Self {
        Self {
            queue_updates: true,
            ..Self::default()
        }
    }

    pub fn queues_updates(&self) -> bool {
        self.queue_updates
    }

    /// Replace vertex and/or index data wholesale.
    ///
    /// A region whose slice is empty is left untouched (not even allocated).
    /// The index count is set to the number of supplied index words, even
    /// when that is zero.
    pub fn replace_all(&mut self, vertices: Bytes, indices: Bytes) -> Result<(), SceneError> {
        check_aligned(Region::Vertex, &vertices)?;
        check_aligned(Region::Index, &indices)?;

        if !vertices.is_empty() {
            let region = self.vertices.get_or_insert_with(Vec::new);
            region.clear();
            region.extend_from_slice(&vertices);
            self.supersede(Region::Vertex);
            self.enqueue(BufferUpdate::ReplaceVertices(vertices));
        }
        let index_count = (indices.len() / INDEX_STRIDE) as u32;
        if !indices.is_empty() {
            let region = self.indices.get_or_insert_with(Vec::new);
            region.clear();
            region.extend_from_slice(&indices);
            self.supersede(Region::Index);
            self.enqueue(BufferUpdate::ReplaceIndices(indices));
        }
        self.index_count = index_count;
        self.initialized = true;
        self.revision += 1;

        tracing::debug!(
            vertices = self.vertex_count(),
            index_count,
            revision = self.revision,
            "scene replaced"
        );
        Ok(())
    }

    /// Overwrite `vertex_count` vertices starting at `vertex_offset` and
    /// `index_count` index words starting at `index_offset`.
    ///
    /// Both sub-ranges are validated before either is written. Fails closed
    /// if no full replace has happened yet or if a sub-range falls outside
    /// its region. The index count is never changed.
    pub fn patch_region(
        &mut self,
        vertex_offset: u32,
        vertex_count: u32,
        index_offset: u32,
        index_count: u32,
        vertices: Bytes,
        indices: Bytes,
    ) -> Result<(), SceneError> {
        if !self.initialized {
            return Err(SceneError::NoBuffer);
        }
        let vertex_range = patch_range(
            Region::Vertex,
            self.vertex_bytes().len(),
            vertex_offset,
            vertex_count,
            &vertices,
        )?;
        let index_range = patch_range(
            Region::Index,
            self.index_bytes().len(),
            index_offset,
            index_count,
            &indices,
        )?;

        if let (Some(range), Some(region)) = (vertex_range, self.vertices.as_mut()) {
            region[range.clone()].copy_from_slice(&vertices);
            self.enqueue(BufferUpdate::PatchVertices {
                byte_offset: range.start,
                data: vertices,
            });
        }
        if let (Some(range), Some(region)) = (index_range, self.indices.as_mut()) {
            region[range.clone()].copy_from_slice(&indices);
            self.enqueue(BufferUpdate::PatchIndices {
                byte_offset: range.start,
                data: indices,
            });
        }
        self.revision += 1;

        tracing::trace!(
            vertex_offset,
            vertex_count,
            index_offset,
            index_count,
            revision = self.revision,
            "scene region patched"
        );
        Ok(())
    }

    /// Raw vertex region; empty until a full replace carries vertices.
    pub fn vertex_bytes(&self) -> &[u8] {
        self.vertices.as_deref().unwrap_or(&[])
    }

    /// Raw index region (little-endian `u32` words).
    pub fn index_bytes(&self) -> &[u8] {
        self.indices.as_deref().unwrap_or(&[])
    }

    /// Number of index words the renderer should draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_count(&self) -> u32 {
        (self.vertex_bytes().len() / VERTEX_STRIDE) as u32
    }

    /// Whether the given region has ever been allocated.
    pub fn has_region(&self, region: Region) -> bool {
        match region {
            Region::Vertex => self.vertices.is_some(),
            Region::Index => self.indices.is_some(),
        }
    }

    /// Whether a full replace has been applied.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Incremented on every accepted mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn pending_updates(&self) -> &[BufferUpdate] {
        &self.pending
    }

    /// Drain queued updates for upload.
    pub fn take_updates(&mut self) -> Vec<BufferUpdate> {
        std::mem::take(&mut self.pending)
    }

    /// Drop queued updates for a region that a full replace makes obsolete.
    fn supersede(&mut self, region: Region) {
        self.pending.retain(|u| u.region() != region);
    }

    /// Must run after the mutation has been written to the regions.
    fn enqueue(&mut self, update: BufferUpdate) {
        if !self.queue_updates {
            return;
        }
        if self.pending.len() < MAX_PENDING_UPDATES {
            self.pending.push(update);
            return;
        }
        tracing::debug!(
            queued = self.pending.len(),
            "update queue full, collapsing to region replaces"
        );
        self.pending.clear();
        if let Some(vertices) = &self.vertices {
            self.pending
                .push(BufferUpdate::ReplaceVertices(Bytes::copy_from_slice(vertices)));
        }
        if let Some(indices) = &self.indices {
            self.pending
                .push(BufferUpdate::ReplaceIndices(Bytes::copy_from_slice(indices)));
        }
    }
}

fn check_aligned(region: Region, data: &[u8]) -> Result<(), SceneError> {
    let stride = region.stride();
    if data.len() % stride != 0 {
        return Err(SceneError::LengthMismatch {
            region,
            len: data.len(),
            expected: data.len() / stride * stride,
        });
    }
    Ok(())
}

/// Byte range a patch would write, or `None` for an empty patch.
fn patch_range(
    region: Region,
    region_len: usize,
    offset: u32,
    count: u32,
    data: &[u8],
) -> Result<Option<std::ops::Range<usize>>, SceneError> {
    let stride = region.stride();
    let expected = count as usize * stride;
    if data.len() != expected {
        return Err(SceneError::LengthMismatch {
            region,
            len: data.len(),
            expected,
        });
    }
    if count == 0 {
        return Ok(None);
    }
    let start = offset as usize * stride;
    let end = start + expected;
    if end > region_len {
        return Err(SceneError::OutOfBounds {
            region,
            offset,
            count,
            len: region_len / stride,
        });
    }
    Ok(Some(start..end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex_bytes(count: usize, fill: u8) -> Bytes {
        Bytes::from(vec![fill; count * VERTEX_STRIDE])
    }

    fn index_bytes(words: &[u32]) -> Bytes {
        Bytes::from(words.iter().flat_map(|w| w.to_le_bytes()).collect::<Vec<u8>>())
    }

    fn cube_scene() -> SceneBuffer {
        let mut scene = SceneBuffer::with_update_queue();
        let indices: Vec<u32> = (0..36).map(|i| i % 8).collect();
        scene
            .replace_all(vertex_bytes(8, 0x11), index_bytes(&indices))
            .unwrap();
        scene
    }

    #[test]
    fn replace_all_mirrors_payload() {
        let verts: Bytes = (0..8 * VERTEX_STRIDE).map(|i| i as u8).collect::<Vec<_>>().into();
        let indices: Vec<u32> = (0..36).collect();
        let mut scene = SceneBuffer::new();
        scene.replace_all(verts.clone(), index_bytes(&indices)).unwrap();

        assert_eq!(scene.index_count(), 36);
        assert_eq!(scene.vertex_count(), 8);
        assert_eq!(scene.vertex_bytes(), &verts[..]);
        assert_eq!(scene.index_bytes(), &index_bytes(&indices)[..]);
        assert!(scene.is_initialized());
        assert_eq!(scene.revision(), 1);
    }

    #[test]
    fn zero_vertices_leaves_vertex_region_unallocated() {
        let mut scene = SceneBuffer::with_update_queue();
        scene.replace_all(Bytes::new(), index_bytes(&[0, 1, 2])).unwrap();

        assert!(!scene.has_region(Region::Vertex));
        assert!(scene.vertex_bytes().is_empty());
        assert!(scene.has_region(Region::Index));
        assert_eq!(scene.index_count(), 3);
        assert_eq!(
            scene.pending_updates(),
            &[BufferUpdate::ReplaceIndices(index_bytes(&[0, 1, 2]))]
        );
    }

    #[test]
    fn zero_vertices_keeps_previous_vertex_data() {
        let mut scene = cube_scene();
        scene.replace_all(Bytes::new(), index_bytes(&[7, 6, 5])).unwrap();
        assert_eq!(scene.vertex_bytes(), &vertex_bytes(8, 0x11)[..]);
        assert_eq!(scene.index_count(), 3);
    }

    #[test]
    fn zero_indices_sets_count_but_keeps_index_data() {
        let mut scene = cube_scene();
        let before = scene.index_bytes().to_vec();
        scene.replace_all(vertex_bytes(4, 0x22), Bytes::new()).unwrap();
        assert_eq!(scene.index_count(), 0);
        assert_eq!(scene.index_bytes(), &before[..]);
        assert_eq!(scene.vertex_count(), 4);
    }

    #[test]
    fn patch_before_full_is_rejected() {
        let mut scene = SceneBuffer::new();
        let err = scene
            .patch_region(0, 1, 0, 0, vertex_bytes(1, 0xFF), Bytes::new())
            .unwrap_err();
        assert_eq!(err, SceneError::NoBuffer);
        assert!(!scene.has_region(Region::Vertex));
        assert!(scene.pending_updates().is_empty());
    }

    #[test]
    fn patch_overwrites_only_the_target_range() {
        let mut scene = cube_scene();
        let before_vertices = scene.vertex_bytes().to_vec();
        let before_indices = scene.index_bytes().to_vec();
        scene.take_updates();

        scene
            .patch_region(2, 3, 10, 2, vertex_bytes(3, 0xAB), index_bytes(&[99, 98]))
            .unwrap();

        let v = scene.vertex_bytes();
        let (lo, hi) = (2 * VERTEX_STRIDE, 5 * VERTEX_STRIDE);
        assert_eq!(&v[..lo], &before_vertices[..lo]);
        assert!(v[lo..hi].iter().all(|b| *b == 0xAB));
        assert_eq!(&v[hi..], &before_vertices[hi..]);

        let i = scene.index_bytes();
        assert_eq!(&i[..40], &before_indices[..40]);
        assert_eq!(&i[40..48], &index_bytes(&[99, 98])[..]);
        assert_eq!(&i[48..], &before_indices[48..]);

        assert_eq!(scene.index_count(), 36);
        assert_eq!(
            scene.take_updates(),
            vec![
                BufferUpdate::PatchVertices {
                    byte_offset: lo,
                    data: vertex_bytes(3, 0xAB)
                },
                BufferUpdate::PatchIndices {
                    byte_offset: 40,
                    data: index_bytes(&[99, 98])
                },
            ]
        );
    }

    #[test]
    fn patch_is_idempotent() {
        let mut once = cube_scene();
        let mut twice = cube_scene();
        let patch = || (1, 2, 0, 3, vertex_bytes(2, 0x5A), index_bytes(&[3, 2, 1]));

        let (vo, vc, io, ic, vb, ib) = patch();
        once.patch_region(vo, vc, io, ic, vb, ib).unwrap();
        for _ in 0..2 {
            let (vo, vc, io, ic, vb, ib) = patch();
            twice.patch_region(vo, vc, io, ic, vb, ib).unwrap();
        }
        assert_eq!(once.vertex_bytes(), twice.vertex_bytes());
        assert_eq!(once.index_bytes(), twice.index_bytes());
        assert_eq!(once.index_count(), twice.index_count());
    }

    #[test]
    fn out_of_range_patch_fails_closed() {
        let mut scene = cube_scene();
        let before_vertices = scene.vertex_bytes().to_vec();
        let before_indices = scene.index_bytes().to_vec();
        let revision = scene.revision();
        scene.take_updates();

        // Index part is valid, vertex part runs one past the end.
        let err = scene
            .patch_region(7, 2, 0, 1, vertex_bytes(2, 0xEE), index_bytes(&[5]))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::OutOfBounds {
                region: Region::Vertex,
                offset: 7,
                count: 2,
                len: 8
            }
        );
        assert_eq!(scene.vertex_bytes(), &before_vertices[..]);
        assert_eq!(scene.index_bytes(), &before_indices[..]);
        assert_eq!(scene.revision(), revision);
        assert!(scene.pending_updates().is_empty());
    }

    #[test]
    fn index_patch_into_unallocated_region_is_out_of_bounds() {
        let mut scene = SceneBuffer::new();
        scene.replace_all(vertex_bytes(2, 0), Bytes::new()).unwrap();
        let err = scene
            .patch_region(0, 0, 0, 1, Bytes::new(), index_bytes(&[0]))
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::OutOfBounds {
                region: Region::Index,
                len: 0,
                ..
            }
        ));
    }

    #[test]
    fn patch_length_must_match_count() {
        let mut scene = cube_scene();
        let err = scene
            .patch_region(0, 2, 0, 0, vertex_bytes(1, 0), Bytes::new())
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::LengthMismatch {
                region: Region::Vertex,
                len: 28,
                expected: 56
            }
        );
    }

    #[test]
    fn full_replace_supersedes_queued_updates() {
        let mut scene = cube_scene();
        scene
            .patch_region(0, 1, 0, 0, vertex_bytes(1, 0x01), Bytes::new())
            .unwrap();
        scene.replace_all(vertex_bytes(3, 0x02), Bytes::new()).unwrap();

        let updates = scene.take_updates();
        // The first index replace survives; both vertex updates collapse into one.
        assert_eq!(updates.len(), 2);
        assert!(matches!(updates[0], BufferUpdate::ReplaceIndices(_)));
        assert_eq!(updates[1], BufferUpdate::ReplaceVertices(vertex_bytes(3, 0x02)));
        assert!(scene.take_updates().is_empty());
    }

    #[test]
    fn plain_buffer_queues_nothing() {
        let mut scene = SceneBuffer::new();
        scene
            .replace_all(vertex_bytes(8, 0), index_bytes(&[0, 1, 2]))
            .unwrap();
        for i in 0..10_000u32 {
            scene
                .patch_region(i % 8, 1, 0, 0, vertex_bytes(1, i as u8), Bytes::new())
                .unwrap();
        }
        assert!(!scene.queues_updates());
        assert!(scene.pending_updates().is_empty());
        assert_eq!(scene.revision(), 10_001);
    }

    #[test]
    fn undrained_queue_stays_bounded() {
        let mut scene = cube_scene();
        for i in 0..10_000u32 {
            scene
                .patch_region(i % 8, 1, 0, 0, vertex_bytes(1, i as u8), Bytes::new())
                .unwrap();
            assert!(scene.pending_updates().len() <= MAX_PENDING_UPDATES);
        }

        // Replaying the queue from scratch reproduces the current regions.
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for update in scene.take_updates() {
            match update {
                BufferUpdate::ReplaceVertices(data) => vertices = data.to_vec(),
                BufferUpdate::ReplaceIndices(data) => indices = data.to_vec(),
                BufferUpdate::PatchVertices { byte_offset, data } => {
                    vertices[byte_offset..byte_offset + data.len()].copy_from_slice(&data);
                }
                BufferUpdate::PatchIndices { .. } => panic!("no index patches were applied"),
            }
        }
        assert_eq!(vertices, scene.vertex_bytes());
        assert_eq!(indices, scene.index_bytes());
    }

    #[test]
    fn misaligned_replace_is_rejected() {
        let mut scene = SceneBuffer::new();
        let err = scene
            .replace_all(Bytes::from(vec![0u8; 30]), Bytes::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::LengthMismatch {
                region: Region::Vertex,
                ..
            }
        ));
        assert!(!scene.is_initialized());
    }
}
