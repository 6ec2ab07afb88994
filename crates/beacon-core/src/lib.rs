//! # beacon-core
//!
//! Shared library for Cursor Beacon containing the position data model, the
//! broadcast payload encoding, the probe traits that stand in for the host's
//! pointer and window queries, and the time-bounded window cache.
//!
//! This crate has no dependencies on async runtimes, sockets, or OS APIs.
//! The server crate supplies the platform probes and the transport.
//!
//! # Architecture overview
//!
//! Cursor Beacon samples the host pointer location and the bounding boxes of
//! the visible browser windows, computes where the pointer sits relative to
//! each window, and pushes the result to every connected subscriber at a fixed
//! cadence.
//!
//! - **`domain`** – Value types ([`CursorPosition`], [`WindowRect`],
//!   [`BroadcastMessage`]) and the pure per-tick computation that turns one
//!   sample into the outgoing payload.
//!
//! - **`probe`** – The [`PointerSource`] and [`WindowSource`] traits plus the
//!   parser for the window-listing text produced by the scripting bridge.
//!
//! - **`cache`** – [`WindowCache`], which memoizes the expensive window query
//!   for a fixed TTL so the broadcast loop can run every few milliseconds.

pub mod cache;
pub mod domain;
pub mod probe;

pub use cache::WindowCache;
pub use domain::geometry::{CursorPosition, WindowRect};
pub use domain::positions::{compute_positions, encode_payload, BroadcastMessage, PayloadError};
pub use probe::{PointerSource, ProbeError, WindowSource};
