//! Host probes: the pointer location and the browser window list.
//!
//! Each platform implements [`PointerSource`] and [`WindowSource`]; the
//! correct pair is selected at compile time via `#[cfg(target_os = ...)]`
//! and re-exported as `NativePointerSource` / `NativeWindowSource`:
//!
//! | Module        | OS     | Pointer                   | Windows                         |
//! |---------------|--------|---------------------------|---------------------------------|
//! | `macos`       | macOS  | `CGEventGetLocation`      | `osascript` over Google Chrome  |
//! | `unsupported` | others | always `Unsupported`      | always `Unsupported`            |
//!
//! On unsupported platforms the server still starts; every tick is skipped
//! and logged.
//!
//! [`PointerSource`]: beacon_core::PointerSource
//! [`WindowSource`]: beacon_core::WindowSource

use std::process::Command;

use beacon_core::ProbeError;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod unsupported;

#[cfg(target_os = "macos")]
pub use macos::{MacosPointerSource as NativePointerSource, MacosWindowSource as NativeWindowSource};
#[cfg(not(target_os = "macos"))]
pub use unsupported::{
    UnsupportedPointerSource as NativePointerSource, UnsupportedWindowSource as NativeWindowSource,
};

/// Runs a helper program to completion and returns its stdout.
///
/// # Errors
///
/// - [`ProbeError::Spawn`] if the program cannot be started.
/// - [`ProbeError::CommandFailed`] if it exits with a non-zero status.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn run_helper(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ProbeError::Spawn {
            command: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            command: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
