//! The seam between the connection core and the WebSocket library.
//!
//! Sessions and the broadcaster only see [`SubscriberSink`] for writes and a
//! stream of [`InboundFrame`]s for reads.  The infrastructure layer adapts
//! `tokio-tungstenite` to these; tests use in-memory doubles.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

/// Per-connection transport failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// A write did not complete within its deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The connection was already closed by this side.
    #[error("connection already closed")]
    Closed,

    /// The underlying protocol or socket reported an error.
    #[error("connection error: {0}")]
    Connection(String),
}

/// An inbound frame, reduced to what the session cares about.
///
/// Ping and pong payloads are dropped; replies to pings are sent by the
/// WebSocket library itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

/// The write half of one subscriber connection.
///
/// Implementations serialise concurrent writers internally: the broadcaster
/// and the session's ping task may write at the same time.
#[async_trait]
pub trait SubscriberSink: Send + Sync {
    /// Sends one text frame.
    async fn send_text(&self, payload: &str) -> Result<(), TransportError>;

    /// Sends a ping control frame.
    async fn send_ping(&self) -> Result<(), TransportError>;

    /// Closes the connection.  Later writes fail with [`TransportError::Closed`].
    async fn close(&self);
}

/// Runs a write, failing with [`TransportError::WriteTimeout`] past `deadline`.
pub async fn with_deadline<F>(deadline: Duration, write: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    match timeout(deadline, write).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::WriteTimeout(deadline)),
    }
}

/// Closes a sink, giving up after `deadline`.
pub async fn close_with_deadline(sink: &dyn SubscriberSink, deadline: Duration) {
    let _ = timeout(deadline, sink.close()).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
