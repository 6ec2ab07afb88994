//! Cursor Beacon server: entry point.
//!
//! Samples the host pointer every few milliseconds, works out where it sits
//! relative to each visible browser window, and pushes the result to every
//! connected WebSocket subscriber.
//!
//! # Usage
//!
//! ```text
//! beacon-server [OPTIONS]
//!
//! Options:
//!   --config <FILE>              TOML configuration file
//!   --bind <IP>                  Listener address [default: 127.0.0.1]
//!   --port <PORT>                Listener port [default: 8080]
//!   --path <PATH>                WebSocket upgrade path [default: /ws]
//!   --broadcast-rate-ms <MS>     Broadcast period [default: 4]
//!   --write-deadline-ms <MS>     Per-write deadline [default: 200]
//!   --chrome-offset-y <PX>       Browser toolbar height [default: 90]
//!   --window-cache-ttl-ms <MS>   Window list cache lifetime [default: 100]
//!   --pong-wait-ms <MS>          Idle timeout without a pong [default: 60000]
//!   --ping-period-ms <MS>        Ping period [default: 54000]
//!   --log-level <FILTER>         Log filter when RUST_LOG is unset [default: info]
//! ```
//!
//! # Configuration layers
//!
//! Built-in defaults, then the config file, then CLI flags or their
//! environment variables.  Later layers win.
//!
//! | Variable        | Flag          |
//! |-----------------|---------------|
//! | `BEACON_CONFIG` | `--config`    |
//! | `BEACON_BIND`   | `--bind`      |
//! | `PORT`          | `--port`      |
//! | `BEACON_PATH`   | `--path`      |
//! | `RUST_LOG`      | `--log-level` |

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use beacon_core::WindowCache;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beacon_server::application::{Broadcaster, ClientRegistry};
use beacon_server::domain::ServerConfig;
use beacon_server::infrastructure::{
    bind_listener, run_server, FileConfig, NativePointerSource, NativeWindowSource,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Cursor Beacon: stream the pointer position relative to each browser window.
///
/// Every option left unset falls back to the config file, then to the
/// built-in default.
#[derive(Debug, Default, Parser)]
#[command(
    name = "beacon-server",
    about = "Streams the pointer position relative to each browser window over WebSocket",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "BEACON_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to bind the listener to.
    #[arg(long, env = "BEACON_BIND")]
    bind: Option<String>,

    /// TCP port for the listener.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Request path that is upgraded to a WebSocket.
    #[arg(long, env = "BEACON_PATH")]
    path: Option<String>,

    #[arg(long)]
    broadcast_rate_ms: Option<u64>,

    #[arg(long)]
    write_deadline_ms: Option<u64>,

    /// Height of the browser toolbar in pixels.
    #[arg(long, allow_negative_numbers = true)]
    chrome_offset_y: Option<i32>,

    /// Lifetime of a cached window enumeration; 0 disables caching.
    #[arg(long)]
    window_cache_ttl_ms: Option<u64>,

    #[arg(long)]
    pong_wait_ms: Option<u64>,

    #[arg(long)]
    ping_period_ms: Option<u64>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file named by `--config`, if any.
    fn load_file(&self) -> anyhow::Result<Option<FileConfig>> {
        self.config
            .as_deref()
            .map(FileConfig::load)
            .transpose()
            .context("failed to load configuration file")
    }

    /// Layers the CLI over `file` over the defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address or the resulting
    /// configuration is inconsistent.
    fn into_server_config(self, file: Option<&FileConfig>) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::default();
        if let Some(file) = file {
            file.apply(&mut config);
        }

        if let Some(bind) = &self.bind {
            let ip: IpAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(path) = self.path {
            config.ws_path = path;
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

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// `RUST_LOG` first, then `--log-level`, then the file's `log_level`, then `info`.
fn log_filter(cli_level: Option<&str>, file: Option<&FileConfig>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cli_level
            .or_else(|| file.and_then(|f| f.log_level.as_deref()))
            .unwrap_or("info");
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// # What happens at startup
///
/// 1. CLI arguments and the optional config file are merged into a validated
///    [`ServerConfig`].
/// 2. `tracing_subscriber` is initialised.
/// 3. The listener is bound; failure here is fatal.
/// 4. The broadcaster starts ticking in its own task.
/// 5. A Ctrl+C handler clears the shared `running` flag.
/// 6. [`run_server`] accepts subscribers until the flag is cleared, after
///    which the broadcaster is stopped and awaited.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = cli.load_file()?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.log_level.as_deref(), file.as_ref()))
        .init();

    let config = Arc::new(cli.into_server_config(file.as_ref())?);
    info!(
        "Cursor Beacon starting: addr={}, path={}, rate={:?}, cache ttl={:?}",
        config.bind_addr, config.ws_path, config.broadcast_rate, config.window_cache_ttl
    );

    let listener = bind_listener(config.bind_addr).await?;

    let registry = Arc::new(ClientRegistry::new());
    let windows = Arc::new(WindowCache::new(
        Box::new(NativeWindowSource::new()),
        config.window_cache_ttl,
    ));
    let broadcaster = Arc::new(Broadcaster::new(
        Arc::new(NativePointerSource::new()),
        windows,
        Arc::clone(&registry),
        &config,
    ));

    let running = Arc::new(AtomicBool::new(true));
    let broadcast_task = tokio::spawn(broadcaster.run(Arc::clone(&running)));

    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let served = run_server(listener, Arc::clone(&config), registry, Arc::clone(&running)).await;

    running.store(false, Ordering::SeqCst);
    let _ = broadcast_task.await;
    served?;

    info!("Cursor Beacon stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_with_no_flags_yields_default_config() {
        // Arrange
        let cli = Cli::default();

        // Act
        let config = cli.into_server_config(None).unwrap();

        // Assert
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli {
            port: Some(9999),
            ..Cli::default()
        };
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9999");
    }

    #[test]
    fn test_cli_bind_override() {
        let cli = Cli {
            bind: Some("0.0.0.0".to_string()),
            ..Cli::default()
        };
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_cli_path_override() {
        let cli = Cli {
            path: Some("/cursor".to_string()),
            ..Cli::default()
        };
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.ws_path, "/cursor");
    }

    #[test]
    fn test_cli_timing_overrides() {
        // Arrange
        let cli = Cli {
            broadcast_rate_ms: Some(16),
            write_deadline_ms: Some(50),
            window_cache_ttl_ms: Some(0),
            pong_wait_ms: Some(10_000),
            ping_period_ms: Some(9_000),
            ..Cli::default()
        };

        // Act
        let config = cli.into_server_config(None).unwrap();

        // Assert
        assert_eq!(config.broadcast_rate, Duration::from_millis(16));
        assert_eq!(config.write_deadline, Duration::from_millis(50));
        assert_eq!(config.window_cache_ttl, Duration::ZERO);
        assert_eq!(config.pong_wait, Duration::from_secs(10));
        assert_eq!(config.ping_period, Duration::from_secs(9));
    }

    #[test]
    fn test_cli_negative_chrome_offset() {
        let cli = Cli {
            chrome_offset_y: Some(-20),
            ..Cli::default()
        };
        let config = cli.into_server_config(None).unwrap();
        assert_eq!(config.chrome_offset_y, -20);
    }

    #[test]
    fn test_cli_flags_without_env_fallback_parse() {
        // Only flags with no `env` attribute, so the environment cannot leak in.
        let cli = Cli::parse_from([
            "beacon-server",
            "--chrome-offset-y",
            "-20",
            "--broadcast-rate-ms",
            "16",
            "--window-cache-ttl-ms",
            "0",
            "--log-level",
            "debug",
        ]);

        assert_eq!(cli.chrome_offset_y, Some(-20));
        assert_eq!(cli.broadcast_rate_ms, Some(16));
        assert_eq!(cli.window_cache_ttl_ms, Some(0));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_overrides_file_value() {
        // Arrange: the file sets the port, the CLI sets it again
        let file = FileConfig::parse("port = 7000\nchrome_offset_y = 60").unwrap();
        let cli = Cli {
            port: Some(7001),
            ..Cli::default()
        };

        // Act
        let config = cli.into_server_config(Some(&file)).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 7001);
        assert_eq!(config.chrome_offset_y, 60);
    }

    #[test]
    fn test_invalid_bind_returns_error() {
        let cli = Cli {
            bind: Some("not.an.ip".to_string()),
            ..Cli::default()
        };
        assert!(cli.into_server_config(None).is_err());
    }

    #[test]
    fn test_ping_period_not_below_pong_wait_returns_error() {
        let cli = Cli {
            pong_wait_ms: Some(1000),
            ping_period_ms: Some(1000),
            ..Cli::default()
        };
        assert!(cli.into_server_config(None).is_err());
    }

    #[test]
    fn test_load_file_without_flag_is_none() {
        let cli = Cli::default();
        assert!(cli.load_file().unwrap().is_none());
    }
}
