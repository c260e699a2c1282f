//! The socket seam. The session only sees whole messages; framing, pings and
//! the close handshake belong to the transport.

use std::future::Future;

use bytes::Bytes;

/// A complete message received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Binary(Bytes),
    Text(String),
}

/// A message for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(&'static str),
    Binary(Bytes),
}

/// Errors from connecting, sending or receiving.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

/// One established duplex connection.
pub trait Transport {
    fn send(&mut self, message: Outbound) -> impl Future<Output = Result<(), TransportError>>;

    /// Wait for the next message. `None` once the peer has closed.
    ///
    /// Must be cancel-safe: dropping the future before it completes must not
    /// lose a message.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Inbound, TransportError>>>;

    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>>;
}

/// Establishes transports to an address.
pub trait Connector {
    type Transport: Transport;

    fn connect(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Transport, TransportError>>;
}
