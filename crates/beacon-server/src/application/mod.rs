//! Application layer for beacon-server.
//!
//! The connection core: the registry of live subscribers, the per-connection
//! session state machine, and the broadcast loop.  Everything here talks to
//! the network through the [`transport::SubscriberSink`] seam, so it can be
//! driven entirely by in-memory doubles in tests.

pub mod broadcaster;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use broadcaster::{Broadcaster, TickError, TickReport};
pub use registry::{ClientInfo, ClientRegistry, ConnectionHandle, FanOut, Registration, Visit};
pub use session::{ConnectionSession, ExitReason, SessionState, SessionSummary};
pub use transport::{InboundFrame, SubscriberSink, TransportError};
