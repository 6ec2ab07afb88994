//! Infrastructure layer for beacon-server.
//!
//! Everything that touches the operating system or the network:
//!
//! - `ws_server`: TCP listener, WebSocket upgrade, and the
//!   `tokio-tungstenite` adapter behind the subscriber sink seam.
//! - `system`: the native pointer and window probes.
//! - `config_file`: the optional TOML configuration file.
//!
//! Protocol decisions (what to send, when to evict, when a session ends)
//! belong to the application layer, not here.

pub mod config_file;
pub mod system;
pub mod ws_server;

pub use config_file::{ConfigFileError, FileConfig};
pub use system::{NativePointerSource, NativeWindowSource};
pub use ws_server::{bind_listener, run_server};
