//! ConnectionSession: lifecycle of one subscriber connection.
//!
//! # States
//!
//! ```text
//! Connected ──(read failure | idle timeout | peer close | eviction)──► Draining ──► Closed
//! ```
//!
//! - **Connected**: registered with the [`ClientRegistry`], reading frames
//!   one at a time, with a ping sub-task running every `ping_period`.  The
//!   read deadline starts at `pong_wait` and is pushed back by every pong.
//! - **Draining**: the ping sub-task is stopped and awaited, the entry is
//!   removed from the registry, and the sink is closed.
//! - **Closed**: terminal; [`ConnectionSession::run`] has returned.
//!
//! There are no retries.  A broken connection is abandoned and the peer is
//! expected to reconnect.
//!
//! # Task structure
//!
//! The read loop and the ping sub-task share a `watch` stop signal.  The read
//! loop flips it on exit and then awaits the ping task, so no timer outlives
//! the session.

use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{debug, info};

use super::registry::{ClientRegistry, ConnectionHandle};
use super::transport::{close_with_deadline, with_deadline, InboundFrame, SubscriberSink, TransportError};
use crate::domain::config::KeepaliveConfig;
use crate::domain::messages::declared_client_id;

/// Position of a session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Draining,
    Closed,
}

/// Why the read loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The peer sent a close frame or the stream ended.
    PeerClosed,
    /// No pong arrived within `pong_wait`.
    IdleTimeout,
    /// Reading failed.
    Transport(TransportError),
    /// The broadcaster removed this connection after a failed write.
    Evicted,
}

/// Returned by [`ConnectionSession::run`] once the session is closed.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub handle: ConnectionHandle,
    /// Last id the client declared, empty if it never sent one.
    pub client_id: String,
    pub exit: ExitReason,
    pub duration: Duration,
}

enum ReadEvent {
    Frame(Option<Result<InboundFrame, TransportError>>),
    IdleTimeout,
    Evicted,
}

/// One subscriber connection.
pub struct ConnectionSession {
    handle: ConnectionHandle,
    registry: Arc<ClientRegistry>,
    sink: Arc<dyn SubscriberSink>,
    keepalive: KeepaliveConfig,
    evicted: watch::Receiver<bool>,
    state: SessionState,
    client_id: String,
    opened_at: SystemTime,
}

impl ConnectionSession {
    /// Registers the connection and enters [`SessionState::Connected`].
    pub async fn open(
        sink: Arc<dyn SubscriberSink>,
        registry: Arc<ClientRegistry>,
        keepalive: KeepaliveConfig,
    ) -> Self {
        let registration = registry.register(Arc::clone(&sink)).await;
        Self {
            handle: registration.handle,
            registry,
            sink,
            keepalive,
            evicted: registration.evicted,
            state: SessionState::Connected,
            client_id: String::new(),
            opened_at: SystemTime::now(),
        }
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the read loop over `frames` until the connection ends, then drains.
    pub async fn run<S>(mut self, frames: S) -> SessionSummary
    where
        S: Stream<Item = Result<InboundFrame, TransportError>> + Send,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let pinger = tokio::spawn(ping_loop(
            Arc::clone(&self.sink),
            self.keepalive,
            stop_rx,
            self.handle,
        ));

        let exit = self.read_loop(frames).await;

        self.state = SessionState::Draining;
        debug!("session {}: draining ({exit:?})", self.handle);
        stop_tx.send_replace(true);
        let _ = pinger.await;
        self.registry.unregister(self.handle).await;
        close_with_deadline(self.sink.as_ref(), self.keepalive.write_deadline).await;
        self.state = SessionState::Closed;

        SessionSummary {
            handle: self.handle,
            client_id: std::mem::take(&mut self.client_id),
            exit,
            duration: self.opened_at.elapsed().unwrap_or_default(),
        }
    }

    async fn read_loop<S>(&mut self, frames: S) -> ExitReason
    where
        S: Stream<Item = Result<InboundFrame, TransportError>> + Send,
    {
        let mut frames = pin!(frames);
        let mut read_deadline = Instant::now() + self.keepalive.pong_wait;

        loop {
            if *self.evicted.borrow_and_update() {
                return ExitReason::Evicted;
            }

            let event = tokio::select! {
                biased;
                _ = self.evicted.changed() => ReadEvent::Evicted,
                _ = sleep_until(read_deadline) => ReadEvent::IdleTimeout,
                frame = frames.next() => ReadEvent::Frame(frame),
            };

            let frame = match event {
                ReadEvent::Evicted => return ExitReason::Evicted,
                ReadEvent::IdleTimeout => return ExitReason::IdleTimeout,
                ReadEvent::Frame(None) | ReadEvent::Frame(Some(Ok(InboundFrame::Close))) => {
                    return ExitReason::PeerClosed
                }
                ReadEvent::Frame(Some(Err(e))) => return ExitReason::Transport(e),
                ReadEvent::Frame(Some(Ok(frame))) => frame,
            };

            match frame {
                InboundFrame::Pong => {
                    read_deadline = Instant::now() + self.keepalive.pong_wait;
                }
                InboundFrame::Text(text) => self.handle_payload(text.as_bytes()).await,
                InboundFrame::Binary(bytes) => self.handle_payload(&bytes).await,
                InboundFrame::Ping | InboundFrame::Close => {}
            }
        }
    }

    async fn handle_payload(&mut self, payload: &[u8]) {
        debug!(
            "session {}: received {}",
            self.handle,
            String::from_utf8_lossy(payload)
        );
        let Some(id) = declared_client_id(payload) else {
            return;
        };
        if self.registry.update_id(self.handle, id.clone()).await {
            info!("session {}: client identified as {id:?}", self.handle);
            self.client_id = id;
        }
    }
}

async fn ping_loop(
    sink: Arc<dyn SubscriberSink>,
    keepalive: KeepaliveConfig,
    mut stop: watch::Receiver<bool>,
    handle: ConnectionHandle,
) {
    let period = keepalive.ping_period;
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = with_deadline(keepalive.write_deadline, sink.send_ping()).await {
            // The read deadline ends the session.
            debug!("session {handle}: ping failed: {e}");
            break;
        }
        debug!("session {handle}: ping sent");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
