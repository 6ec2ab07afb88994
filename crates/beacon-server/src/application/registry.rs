//! ClientRegistry: the set of live subscriber connections.
//!
//! The registry is the only state shared between connection sessions and the
//! broadcaster.  Every access goes through one async mutex:
//!
//! - Sessions take it briefly to register, relabel, and unregister.
//! - The broadcaster holds it for the whole fan-out of a tick, so a
//!   registration or removal that races a tick lands before or after that
//!   tick, never in the middle of it.
//!
//! # Entry lifecycle
//!
//! ```text
//! register()  ──►  [entry: id "", connected_at]  ──►  unregister()      (session ended)
//!                                                └──►  for_each → Evict  (write failed)
//! ```
//!
//! An evicted entry fires its eviction signal so the owning session stops
//! reading and tears the connection down.  Removal is idempotent, so the
//! session's own `unregister` after an eviction is harmless.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{watch, Mutex};
use tracing::debug;
use uuid::Uuid;

use super::transport::SubscriberSink;

/// Opaque key identifying one connection in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(Uuid);

impl ConnectionHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first UUID group is plenty to tell connections apart in logs.
        let id = self.0.simple().to_string();
        f.write_str(&id[..8])
    }
}

/// Metadata kept for each live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Identifier declared by the client; empty until it sends one.
    pub id: String,
    pub connected_at: SystemTime,
}

/// What [`ClientRegistry::for_each`] should do with the entry just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Evict,
}

/// Outcome of one [`ClientRegistry::for_each`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub visited: usize,
    pub evicted: usize,
}

/// Returned by [`ClientRegistry::register`].
#[derive(Debug)]
pub struct Registration {
    pub handle: ConnectionHandle,
    /// Becomes `true` (or closes) when the broadcaster evicts this entry.
    pub evicted: watch::Receiver<bool>,
}

struct RegistryEntry {
    info: ClientInfo,
    sink: Arc<dyn SubscriberSink>,
    evicted: watch::Sender<bool>,
}

/// Concurrent registry of subscriber connections.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionHandle, RegistryEntry>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection with an empty id and the current time.
    pub async fn register(&self, sink: Arc<dyn SubscriberSink>) -> Registration {
        let handle = ConnectionHandle::new();
        let (evicted_tx, evicted_rx) = watch::channel(false);
        let entry = RegistryEntry {
            info: ClientInfo {
                id: String::new(),
                connected_at: SystemTime::now(),
            },
            sink,
            evicted: evicted_tx,
        };

        let mut clients = self.clients.lock().await;
        clients.insert(handle, entry);
        debug!("registered {handle}; {} client(s)", clients.len());

        Registration {
            handle,
            evicted: evicted_rx,
        }
    }

    /// Removes a connection.  Returns `false` if it was already gone.
    pub async fn unregister(&self, handle: ConnectionHandle) -> bool {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&handle).is_some();
        if removed {
            debug!("unregistered {handle}; {} client(s)", clients.len());
        }
        removed
    }

    /// Sets the client-declared id.  Returns `false` if the handle is gone.
    pub async fn update_id(&self, handle: ConnectionHandle, id: impl Into<String>) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.get_mut(&handle) {
            Some(entry) => {
                entry.info.id = id.into();
                true
            }
            None => false,
        }
    }

    pub async fn client_info(&self, handle: ConnectionHandle) -> Option<ClientInfo> {
        self.clients
            .lock()
            .await
            .get(&handle)
            .map(|entry| entry.info.clone())
    }

    /// Returns every handle with its metadata.
    pub async fn snapshot(&self) -> Vec<(ConnectionHandle, ClientInfo)> {
        self.clients
            .lock()
            .await
            .iter()
            .map(|(handle, entry)| (*handle, entry.info.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    /// Visits every registered connection while holding the registry lock.
    ///
    /// Entries for which `visit` returns [`Visit::Evict`] are removed before
    /// the lock is released and their eviction signal is fired.
    pub async fn for_each<F, Fut>(&self, mut visit: F) -> FanOut
    where
        F: FnMut(ConnectionHandle, Arc<dyn SubscriberSink>) -> Fut,
        Fut: Future<Output = Visit>,
    {
        let mut clients = self.clients.lock().await;
        let targets: Vec<(ConnectionHandle, Arc<dyn SubscriberSink>)> = clients
            .iter()
            .map(|(handle, entry)| (*handle, Arc::clone(&entry.sink)))
            .collect();

        let mut fan_out = FanOut {
            visited: targets.len(),
            evicted: 0,
        };
        for (handle, sink) in targets {
            if visit(handle, sink).await == Visit::Evict {
                if let Some(entry) = clients.remove(&handle) {
                    entry.evicted.send_replace(true);
                    fan_out.evicted += 1;
                }
            }
        }
        fan_out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
