//! Connection session for the remote-render stream.
//!
//! A [`Session`] owns one duplex connection and the [`Scene`] it feeds.
//! Inbound binary frames are decoded, applied and acknowledged strictly in
//! arrival order; device input is encoded and sent upstream only while the
//! connection is open.
//!
//! # Invariants
//! - The session is the single writer of its scene.
//! - A frame is fully decoded before anything is mutated, so a dropped frame
//!   or a closed connection never leaves partial state behind.
//! - `"got"` follows an applied full mesh, `"gotregion"` a region patch.
//!   Matrices are never acknowledged.
//!
//! [`Scene`]: remoteview_scene::Scene

pub mod latency;
mod session;
pub mod transport;
mod ws;

pub use latency::{LatencySample, LatencyTracker};
pub use session::{
    ConnectionState, FrameOutcome, FrameReport, Session, SessionCommand, SessionError,
    SessionEvent, SessionStats, apply_message,
};
pub use transport::{Connector, Inbound, Outbound, Transport, TransportError};
pub use ws::{WsConnector, WsTransport, normalize_address};

pub fn crate_info() -> &'static str {
    "remoteview-session v0.1.0"
}
