use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::transport::{Connector, Inbound, Outbound, Transport, TransportError};

type Stream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Prefix `ws://` when the address has no scheme (`localhost:9008`).
pub fn normalize_address(address: &str) -> Result<String, TransportError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(TransportError::InvalidAddress(address.to_owned()));
    }
    if address.contains("://") {
        Ok(address.to_owned())
    } else {
        Ok(format!("ws://{address}"))
    }
}

/// Connects over WebSocket (`ws://` or `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, address: &str) -> Result<WsTransport, TransportError> {
        let url = normalize_address(address)?;
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(%url, status = %response.status(), "websocket handshake complete");
        Ok(WsTransport { stream })
    }
}

/// An open WebSocket connection.
#[derive(Debug)]
pub struct WsTransport {
    stream: Stream,
}

impl Transport for WsTransport {
    async fn send(&mut self, message: Outbound) -> Result<(), TransportError> {
        let message = match message {
            Outbound::Text(text) => Message::Text(Utf8Bytes::from_static(text)),
            Outbound::Binary(data) => Message::Binary(data),
        };
        self.stream.send(message).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Inbound, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            match message {
                Message::Binary(data) => return Some(Ok(Inbound::Binary(data))),
                Message::Text(text) => return Some(Ok(Inbound::Text(text.as_str().to_owned()))),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "peer closed the connection");
                    return None;
                }
                // Pings are answered by tungstenite on the next read or write.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
