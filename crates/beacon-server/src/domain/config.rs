//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup (defaults, then the optional config file, then
//! CLI flags and environment variables) and shared read-only afterwards.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Reasons a [`ServerConfig`] is rejected by [`ServerConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("ping period ({ping_period:?}) must be shorter than pong wait ({pong_wait:?})")]
    PingPeriodTooLong {
        ping_period: Duration,
        pong_wait: Duration,
    },

    #[error("upgrade path must start with '/': {0:?}")]
    InvalidPath(String),
}

/// All runtime configuration for the broadcast server.
///
/// # Example
///
/// ```rust
/// use beacon_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: SocketAddr,

    /// The only request path that is upgraded to a WebSocket session.
    pub ws_path: String,

    /// Period of the broadcast timer.
    pub broadcast_rate: Duration,

    /// Upper bound on any single write (payload or ping) to one subscriber.
    pub write_deadline: Duration,

    /// Height of the browser toolbar, subtracted from every window's Y.
    pub chrome_offset_y: i32,

    /// Maximum age of a cached window enumeration.
    pub window_cache_ttl: Duration,

    /// How long a session waits for a pong before it is considered idle.
    pub pong_wait: Duration,

    /// How often a session pings its peer.  Must be shorter than `pong_wait`.
    pub ping_period: Duration,
}

impl Default for ServerConfig {
    /// | Field            | Default          |
    /// |------------------|------------------|
    /// | bind_addr        | `127.0.0.1:8080` |
    /// | ws_path          | `/ws`            |
    /// | broadcast_rate   | 4 ms             |
    /// | write_deadline   | 200 ms           |
    /// | chrome_offset_y  | 90 px            |
    /// | window_cache_ttl | 100 ms           |
    /// | pong_wait        | 60 s             |
    /// | ping_period      | 54 s             |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            ws_path: "/ws".to_string(),
            broadcast_rate: Duration::from_millis(4),
            write_deadline: Duration::from_millis(200),
            chrome_offset_y: 90,
            window_cache_ttl: Duration::from_millis(100),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
        }
    }
}

impl ServerConfig {
    /// Checks the invariants the server relies on.
    ///
    /// `window_cache_ttl` may be zero, which disables caching.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("broadcast rate", self.broadcast_rate),
            ("write deadline", self.write_deadline),
            ("pong wait", self.pong_wait),
            ("ping period", self.ping_period),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        if self.ping_period >= self.pong_wait {
            return Err(ConfigError::PingPeriodTooLong {
                ping_period: self.ping_period,
                pong_wait: self.pong_wait,
            });
        }

        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.ws_path.clone()));
        }

        Ok(())
    }

    /// The keepalive settings a session needs.
    pub fn keepalive(&self) -> KeepaliveConfig {
        KeepaliveConfig {
            pong_wait: self.pong_wait,
            ping_period: self.ping_period,
            write_deadline: self.write_deadline,
        }
    }
}

/// Per-session keepalive timing, extracted from [`ServerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveConfig {
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub write_deadline: Duration,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
