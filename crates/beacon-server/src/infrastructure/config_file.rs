//! Optional TOML configuration file.
//!
//! Every key is optional; a missing key leaves the built-in default (or the
//! value from an earlier layer) untouched.  Unknown keys are rejected so a
//! typo does not silently fall back to a default.
//!
//! ```toml
//! bind = "127.0.0.1"
//! port = 8080
//! path = "/ws"
//! broadcast_rate_ms = 4
//! write_deadline_ms = 200
//! chrome_offset_y = 90
//! window_cache_ttl_ms = 100
//! pong_wait_ms = 60000
//! ping_period_ms = 54000
//! log_level = "info"
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::ServerConfig;

/// Error type for configuration file loading.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub broadcast_rate_ms: Option<u64>,
    pub write_deadline_ms: Option<u64>,
    pub chrome_offset_y: Option<i32>,
    pub window_cache_ttl_ms: Option<u64>,
    pub pong_wait_ms: Option<u64>,
    pub ping_period_ms: Option<u64>,
    /// `tracing` filter directive, e.g. `"debug"` or `"beacon_server=trace"`.
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError::Io`] if the file cannot be read and
    /// [`ConfigFileError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigFileError> {
        Ok(toml::from_str(text)?)
    }

    /// Overwrites the fields of `config` that this file sets.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(ip) = self.bind {
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(path) = &self.path {
            config.ws_path = path.clone();
        }
        if let Some(ms) = self.broadcast_rate_ms {
            config.broadcast_rate = Duration::from_millis(ms);
        }
        if let Some(ms) = self.write_deadline_ms {
            config.write_deadline = Duration::from_millis(ms);
        }
        if let Some(offset) = self.chrome_offset_y {
            config.chrome_offset_y = offset;
        }
        if let Some(ms) = self.window_cache_ttl_ms {
            config.window_cache_ttl = Duration::from_millis(ms);
        }
        if let Some(ms) = self.pong_wait_ms {
            config.pong_wait = Duration::from_millis(ms);
        }
        if let Some(ms) = self.ping_period_ms {
            config.ping_period = Duration::from_millis(ms);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
