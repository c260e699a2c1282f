use glam::Mat4;

use crate::{BufferUpdate, SceneBuffer, TransformStore};

/// Everything the server streams to us: geometry plus transforms.
///
/// Owned by the connection session, which is its only writer.
#[derive(Debug, Default)]
pub struct Scene {
    pub buffer: SceneBuffer,
    pub transforms: TransformStore,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene whose buffer queues updates for [`SceneDelta::capture`].
    pub fn with_update_queue() -> Self {
        Self {
            buffer: SceneBuffer::with_update_queue(),
            transforms: TransformStore::default(),
        }
    }
}

/// Changes since the last capture, packaged for a renderer on another thread.
///
/// The session thread captures a delta after each frame and sends it over a
/// channel; the render thread applies it before its next draw. Transforms are
/// sent whole since they are tiny.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDelta {
    pub updates: Vec<BufferUpdate>,
    pub index_count: u32,
    pub view: Mat4,
    pub projection: Mat4,
    pub revision: u64,
}

impl SceneDelta {
    /// Drain pending buffer updates from `scene` and snapshot its transforms.
    pub fn capture(scene: &mut Scene) -> Self {
        Self {
            updates: scene.buffer.take_updates(),
            index_count: scene.buffer.index_count(),
            view: scene.transforms.view(),
            projection: scene.transforms.projection(),
            revision: scene.buffer.revision() + scene.transforms.revision(),
        }
    }
}
