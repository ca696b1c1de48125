//! Trait abstractions for runtime I/O
//!
//! The executor only ever talks to the remote service through a
//! [`Connector`], so tests can swap in a scripted one.

use crate::session::Push;
use crate::socket_io::PacketError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Why a handshake did not produce a link
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] PacketError),
    #[error("server refused the connection: {0}")]
    Rejected(String),
    #[error("connection closed during handshake")]
    Closed,
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that happened on an established link
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Push(Push),
    /// Always the last event a link reports
    Closed { reason: String, reconnect: bool },
}

/// An established connection to the remote service
///
/// Dropping `outbound` or cancelling `shutdown` closes the transport.
#[derive(Debug)]
pub struct Link {
    /// User messages to emit as `message` events
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<LinkEvent>,
    pub shutdown: CancellationToken,
}

/// Opens links to the remote service
#[async_trait]
pub trait Connector: Send + Sync {
    /// Complete the full handshake, returning once pushes can flow.
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self, endpoint: &str) -> Result<Link, TransportError> {
        (**self).connect(endpoint).await
    }
}
