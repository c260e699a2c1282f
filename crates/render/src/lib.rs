//! Rendering Adapter: renderer-agnostic interface over the streamed scene.
//!
//! # Invariants
//! - Renderers read scene state; only the connection session writes it.
//! - Indices are always 32-bit. A backend without 32-bit index support
//!   cannot draw the stream and must refuse to start.

mod capability;
mod renderer;

pub use capability::{CapabilityError, RenderCapabilities};
pub use renderer::{DebugTextRenderer, Renderer};

pub fn crate_info() -> &'static str {
    "remoteview-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
