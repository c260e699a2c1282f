//! Scene state: the vertex/index mirror and the view/projection transforms.
//!
//! # Invariants
//! - Only the connection session mutates scene state; renderers read it.
//! - The index count changes only on a full replace, never on a region patch.
//! - A rejected patch leaves every byte and the update queue untouched.
//! - Every accepted mutation is queued as a [`BufferUpdate`] so a GPU backend
//!   can mirror it without re-uploading whole regions.

mod buffer;
mod state;
mod transform;

pub use buffer::{BufferUpdate, MAX_PENDING_UPDATES, Region, SceneBuffer, SceneError};
pub use state::{Scene, SceneDelta};
pub use transform::TransformStore;

pub fn crate_info() -> &'static str {
    "remoteview-scene v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("scene"));
    }
}
