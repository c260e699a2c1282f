//! wgpu render backend for the streamed scene.
//!
//! Mirrors the scene's vertex and index regions in GPU buffers by replaying
//! [`BufferUpdate`]s, and draws them with the server-supplied view and
//! projection matrices.
//!
//! # Invariants
//! - The backend never mutates scene state; it only replays deltas.
//! - Index buffers are always `Uint32`.
//! - Incoming matrices follow OpenGL clip conventions and are corrected to
//!   wgpu's `[0, 1]` depth range before upload.
//!
//! [`BufferUpdate`]: remoteview_scene::BufferUpdate

mod gpu;
mod shaders;

pub use gpu::{GpuScene, OPENGL_TO_WGPU, capabilities};
