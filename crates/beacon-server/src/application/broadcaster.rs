//! Broadcaster: the fixed-rate sampling and fan-out loop.
//!
//! Each tick:
//!
//! 1. Sample the pointer, then the (cached) window list, on a blocking thread.
//! 2. Compute one [`BroadcastMessage`] per window and encode the payload once.
//! 3. Write the same bytes to every registered subscriber while holding the
//!    registry lock, evicting any subscriber whose write fails or runs past
//!    the write deadline.
//!
//! A failed sample skips the tick entirely: no subscriber is written to, and
//! the loop carries on at the next tick.
//!
//! [`BroadcastMessage`]: beacon_core::BroadcastMessage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_core::{
    compute_positions, encode_payload, CursorPosition, PayloadError, PointerSource, ProbeError,
    WindowCache, WindowRect,
};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::registry::{ClientRegistry, Visit};
use super::transport::{close_with_deadline, with_deadline};
use crate::domain::config::ServerConfig;

/// Why a tick was skipped.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("pointer query failed: {0}")]
    Pointer(#[source] ProbeError),

    #[error("window query failed: {0}")]
    Windows(#[source] ProbeError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The blocking sampler task panicked or was cancelled.
    #[error("sampler task failed: {0}")]
    Sampler(String),
}

/// Result of one successful tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Number of windows in the payload.
    pub windows: usize,
    /// Subscribers that received the payload.
    pub delivered: usize,
    /// Subscribers removed because their write failed.
    pub evicted: usize,
}

pub struct Broadcaster {
    pointer: Arc<dyn PointerSource>,
    windows: Arc<WindowCache>,
    registry: Arc<ClientRegistry>,
    chrome_offset_y: i32,
    write_deadline: Duration,
    rate: Duration,
}

impl Broadcaster {
    pub fn new(
        pointer: Arc<dyn PointerSource>,
        windows: Arc<WindowCache>,
        registry: Arc<ClientRegistry>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            pointer,
            windows,
            registry,
            chrome_offset_y: config.chrome_offset_y,
            write_deadline: config.write_deadline,
            rate: config.broadcast_rate,
        }
    }

    /// Runs one sample-compute-fan-out cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`TickError`] when sampling or encoding fails; in that case
    /// nothing was written to any subscriber.
    pub async fn tick(&self) -> Result<TickReport, TickError> {
        let (cursor, windows) = self.sample().await?;
        let messages = compute_positions(cursor, &windows, self.chrome_offset_y);
        let payload: Arc<str> = encode_payload(&messages)?.into();

        // One shared buffer for every subscriber: each visit clones the `Arc`,
        // not the payload text.
        let deadline = self.write_deadline;

        // `for_each` holds the registry lock for the whole fan-out, so a
        // session registering or draining mid-tick waits for this tick to
        // finish.  The per-write deadline bounds how long that wait can be.
        let fan_out = self
            .registry
            .for_each(|handle, sink| {
                let payload = Arc::clone(&payload);
                async move {
                    match with_deadline(deadline, sink.send_text(&payload)).await {
                        Ok(()) => Visit::Keep,
                        Err(e) => {
                            // No retry: the peer is expected to reconnect.
                            warn!("evicting subscriber {handle}: {e}");
                            close_with_deadline(sink.as_ref(), deadline).await;
                            Visit::Evict
                        }
                    }
                }
            })
            .await;

        Ok(TickReport {
            windows: messages.len(),
            delivered: fan_out.visited - fan_out.evicted,
            evicted: fan_out.evicted,
        })
    }

    /// Ticks every `broadcast_rate` until `running` is cleared.
    ///
    /// Missed ticks are skipped rather than bunched up.
    pub async fn run(self: Arc<Self>, running: Arc<AtomicBool>) {
        info!(
            "broadcasting every {:?} (write deadline {:?}, window cache ttl {:?})",
            self.rate,
            self.write_deadline,
            self.windows.ttl()
        );
        let mut ticker = interval(self.rate);
        // A tick that overruns (slow window query, stalled subscriber) must not
        // be followed by a burst of catch-up ticks; the next one waits for the
        // following period boundary instead.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failing = false;

        while running.load(Ordering::SeqCst) {
            ticker.tick().await;
            // The flag may have been cleared while we waited for the tick.
            if !running.load(Ordering::SeqCst) {
                break;
            }

            match self.tick().await {
                Ok(report) => {
                    if failing {
                        info!("sampling recovered");
                        failing = false;
                    }
                    if report.evicted > 0 {
                        debug!(
                            "tick: {} delivered, {} evicted",
                            report.delivered, report.evicted
                        );
                    }
                }
                Err(e) if failing => debug!("tick skipped: {e}"),
                Err(e) => {
                    warn!("tick skipped: {e}");
                    failing = true;
                }
            }
        }

        info!("broadcaster stopped");
    }

    /// Pointer first, then windows, on a blocking thread.
    async fn sample(&self) -> Result<(CursorPosition, Arc<[WindowRect]>), TickError> {
        let pointer = Arc::clone(&self.pointer);
        let windows = Arc::clone(&self.windows);

        // Both probes block (Core Graphics call, `osascript` round trip), so
        // they run on the blocking pool instead of stalling a runtime worker.
        tokio::task::spawn_blocking(move || {
            let cursor = pointer.cursor_position().map_err(TickError::Pointer)?;
            let windows = windows.get().map_err(TickError::Windows)?;
            Ok((cursor, windows))
        })
        .await
        .map_err(|e| TickError::Sampler(e.to_string()))?
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
