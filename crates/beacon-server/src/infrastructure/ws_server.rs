//! WebSocket server: accept loop and the `tokio-tungstenite` adapter.
//!
//! This module is responsible for:
//!
//! 1. Binding the TCP listener on the configured address.
//! 2. Accepting incoming TCP connections.
//! 3. Upgrading requests for the configured path to a WebSocket session and
//!    answering every other path with `404 Not Found`.
//! 4. Handing each upgraded connection to a [`ConnectionSession`] in its own
//!    Tokio task.
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! Origin headers are not checked: any local page may subscribe.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::application::{
    ClientRegistry, ConnectionSession, ExitReason, InboundFrame, SubscriberSink, TransportError,
};
use crate::domain::config::ServerConfig;

/// How often the accept loop wakes up to check the `running` flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener.
///
/// # Errors
///
/// Returns an error if the address is in use or cannot be bound.
pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))
}

/// Runs the accept loop until `running` is set to `false`.
///
/// Each accepted connection runs in its own task, so a slow client never
/// delays the next accept.
///
/// # Errors
///
/// Returns an error if the listener's local address cannot be read.
pub async fn run_server(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    registry: Arc<ClientRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("listening on ws://{local_addr}{}", config.ws_path);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // A short timeout on `accept()` lets the loop notice the `running`
        // flag even when nobody is connecting; without it the loop would
        // block on `accept()` until the next client arrived.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                // Each connection gets its own task so a slow handshake or a
                // stalled peer never delays the next accept.
                let config = Arc::clone(&config);
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, config, registry).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. file descriptor exhaustion); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within ACCEPT_POLL; loop back to check `running`.
            }
        }
    }

    Ok(())
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    registry: Arc<ClientRegistry>,
) {
    let ws_stream = match upgrade(stream, &config.ws_path).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("upgrade from {peer_addr} failed: {e:#}");
            return;
        }
    };

    // Split so the session can read while the broadcaster and the ping task
    // write.  The write half is shared through the registry, hence the `Arc`.
    let (ws_tx, ws_rx) = ws_stream.split();
    let sink = Arc::new(WsSubscriber::new(ws_tx));
    let session = ConnectionSession::open(sink, registry, config.keepalive()).await;
    info!("subscriber {} connected from {peer_addr}", session.handle());

    let summary = session.run(inbound_frames(ws_rx)).await;
    let client = if summary.client_id.is_empty() {
        "<anonymous>"
    } else {
        summary.client_id.as_str()
    };
    match &summary.exit {
        ExitReason::Transport(e) => warn!(
            "subscriber {} ({client}) from {peer_addr} dropped after {:?}: {e}",
            summary.handle, summary.duration
        ),
        exit => info!(
            "subscriber {} ({client}) from {peer_addr} disconnected after {:?}: {exit:?}",
            summary.handle, summary.duration
        ),
    }
}

/// Completes the HTTP upgrade, answering `404` for any other path.
async fn upgrade(stream: TcpStream, ws_path: &str) -> anyhow::Result<WebSocketStream<TcpStream>> {
    let expected = ws_path.to_string();
    let check_path = move |request: &Request, response: Response| {
        if request.uri().path() == expected {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    accept_hdr_async(stream, check_path)
        .await
        .context("WebSocket handshake failed")
}

/// Adapts the read half of a WebSocket to the session's frame stream.
fn inbound_frames<S>(ws_rx: S) -> impl Stream<Item = Result<InboundFrame, TransportError>> + Send
where
    S: Stream<Item = Result<WsMessage, WsError>> + Send,
{
    ws_rx.filter_map(|message| async move {
        match message {
            Ok(WsMessage::Text(text)) => Some(Ok(InboundFrame::Text(text))),
            Ok(WsMessage::Binary(bytes)) => Some(Ok(InboundFrame::Binary(bytes))),
            Ok(WsMessage::Ping(_)) => Some(Ok(InboundFrame::Ping)),
            Ok(WsMessage::Pong(_)) => Some(Ok(InboundFrame::Pong)),
            Ok(WsMessage::Close(_)) => Some(Ok(InboundFrame::Close)),
            // Raw frames are never yielded while reading.
            Ok(WsMessage::Frame(_)) => None,
            Err(WsError::ConnectionClosed) => Some(Ok(InboundFrame::Close)),
            Err(e) => Some(Err(TransportError::Connection(e.to_string()))),
        }
    })
}

// ── Subscriber sink ───────────────────────────────────────────────────────────

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;

/// Write half of one WebSocket connection.
///
/// The broadcaster and the session's ping task both write here; the mutex
/// keeps their frames from interleaving.
struct WsSubscriber {
    sink: Mutex<WsSink>,
    closed: AtomicBool,
}

impl WsSubscriber {
    fn new(sink: WsSink) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
        }
    }

    async fn send(&self, message: WsMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(map_ws_error)
    }
}

#[async_trait]
impl SubscriberSink for WsSubscriber {
    async fn send_text(&self, payload: &str) -> Result<(), TransportError> {
        self.send(WsMessage::Text(payload.to_string())).await
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        self.send(WsMessage::Ping(Vec::new())).await
    }

    async fn close(&self) {
        // Eviction and session drain can both close the same connection.
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut sink = self.sink.lock().await;
        let _ = sink.send(WsMessage::Close(None)).await;
        let _ = sink.close().await;
    }
}

fn map_ws_error(e: WsError) -> TransportError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        other => TransportError::Connection(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
