//! Shared types for the remoteview client.
//!
//! # Invariants
//! - A vertex is exactly [`VERTEX_STRIDE`] bytes on the wire and on the GPU.
//! - An index is exactly [`INDEX_STRIDE`] bytes (little-endian `u32`).

mod time;
mod types;

pub use time::{Timestamp, now_millis};
pub use types::{INDEX_STRIDE, VERTEX_STRIDE, Vertex};

pub fn crate_info() -> &'static str {
    "remoteview-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
