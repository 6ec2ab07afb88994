//! Probe traits for the two host queries the broadcaster depends on.
//!
//! Both queries are blocking, side-effect-free calls into the operating system
//! (or a scripting bridge).  The server crate implements them per platform;
//! tests substitute doubles.
//!
//! | Trait             | Returns                         | Cost                     |
//! |-------------------|---------------------------------|--------------------------|
//! | [`PointerSource`] | current [`CursorPosition`]      | microseconds             |
//! | [`WindowSource`]  | ordered list of [`WindowRect`]  | tens of milliseconds     |
//!
//! The window query is expensive enough that the broadcaster never calls it
//! directly; it goes through [`crate::WindowCache`].

use thiserror::Error;

use crate::domain::geometry::{CursorPosition, WindowRect};

pub mod listing;

/// Error type for host probe failures.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The helper process could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper process ran but reported failure.
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// A native API call failed.
    #[error("platform API error: {0}")]
    Platform(String),

    /// The query has no implementation on this operating system.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Returns the current pointer location.
#[cfg_attr(test, mockall::automock)]
pub trait PointerSource: Send + Sync {
    /// Samples the pointer position in host-screen pixels.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the OS query fails.
    fn cursor_position(&self) -> Result<CursorPosition, ProbeError>;
}

/// Enumerates the visible browser windows.
#[cfg_attr(test, mockall::automock)]
pub trait WindowSource: Send + Sync {
    /// Returns every visible window, in the order the OS reports them.
    ///
    /// Implementations must drop rectangles with non-positive width or height.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the enumeration fails as a whole.  Individual
    /// malformed entries are skipped, not reported.
    fn list_windows(&self) -> Result<Vec<WindowRect>, ProbeError>;
}
