//! Test doubles shared by the application-layer unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beacon_core::{CursorPosition, PointerSource, ProbeError, WindowRect, WindowSource};

use super::transport::{SubscriberSink, TransportError};

/// How a [`RecordingSink`] reacts to writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SinkBehaviour {
    #[default]
    Accept,
    Fail,
    /// Never completes, so only a deadline can end the write.
    Stall,
}

/// Sink that records every frame written to it.
#[derive(Default)]
pub struct RecordingSink {
    pub texts: Mutex<Vec<String>>,
    pub pings: AtomicUsize,
    pub write_attempts: AtomicUsize,
    pub closed: AtomicBool,
    pub behaviour: Mutex<SinkBehaviour>,
}

impl RecordingSink {
    pub fn with_behaviour(behaviour: SinkBehaviour) -> Self {
        Self {
            behaviour: Mutex::new(behaviour),
            ..Self::default()
        }
    }

    pub fn set_behaviour(&self, behaviour: SinkBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn attempt(&self) -> Result<(), TransportError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let behaviour = *self.behaviour.lock().unwrap();
        match behaviour {
            SinkBehaviour::Accept => Ok(()),
            SinkBehaviour::Fail => Err(TransportError::Connection("injected failure".to_string())),
            SinkBehaviour::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl SubscriberSink for RecordingSink {
    async fn send_text(&self, payload: &str) -> Result<(), TransportError> {
        self.attempt().await?;
        self.texts.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    async fn send_ping(&self) -> Result<(), TransportError> {
        self.attempt().await?;
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Pointer source returning a fixed position, or failing.
pub struct FixedPointer(pub Option<CursorPosition>);

impl PointerSource for FixedPointer {
    fn cursor_position(&self) -> Result<CursorPosition, ProbeError> {
        self.0
            .ok_or_else(|| ProbeError::Platform("pointer unavailable".to_string()))
    }
}

/// Window source returning a fixed list, or failing, and counting calls.
pub struct FixedWindows {
    pub windows: Option<Vec<WindowRect>>,
    pub calls: Arc<AtomicUsize>,
}

impl FixedWindows {
    pub fn new(windows: Option<Vec<WindowRect>>) -> Self {
        Self {
            windows,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl WindowSource for FixedWindows {
    fn list_windows(&self) -> Result<Vec<WindowRect>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows
            .clone()
            .ok_or_else(|| ProbeError::Platform("osascript failed".to_string()))
    }
}
