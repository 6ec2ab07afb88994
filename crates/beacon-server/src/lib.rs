//! beacon-server library crate.
//!
//! Samples the host pointer and the browser window rectangles and streams the
//! pointer position, relative to every window, to WebSocket subscribers.
//!
//! # Architecture
//!
//! ```text
//! Subscribers (JSON over WebSocket)
//!         ↕
//! [beacon-server]
//!   ├── domain/           ServerConfig, inbound client announcements
//!   ├── application/      ClientRegistry, ConnectionSession, Broadcaster
//!   └── infrastructure/
//!         ├── ws_server/  Accept loop and tokio-tungstenite adapter
//!         ├── system/     Native pointer and window probes
//!         └── config_file/ Optional TOML configuration
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` and `beacon-core`, and reaches the
//!   network only through the `SubscriberSink` trait and a frame stream.
//! - `infrastructure` depends on all other layers plus `tokio-tungstenite`
//!   and the platform crates.

/// Domain layer: configuration and message types (no I/O).
pub mod domain;

/// Application layer: registry, sessions, and the broadcast loop.
pub mod application;

/// Infrastructure layer: WebSocket server, host probes, config file.
pub mod infrastructure;
