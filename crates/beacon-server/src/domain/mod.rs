//! Domain layer for beacon-server.
//!
//! Plain types with no I/O: the server configuration and the inbound message
//! schema.  Nothing here touches `tokio`, sockets, or the environment.

pub mod config;
pub mod messages;

pub use config::{ConfigError, KeepaliveConfig, ServerConfig};
pub use messages::ClientAnnouncement;
