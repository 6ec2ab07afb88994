//! Probes for platforms without a native implementation.

use beacon_core::{CursorPosition, PointerSource, ProbeError, WindowRect, WindowSource};

#[derive(Debug, Default)]
pub struct UnsupportedPointerSource;

impl UnsupportedPointerSource {
    pub fn new() -> Self {
        Self
    }
}

impl PointerSource for UnsupportedPointerSource {
    fn cursor_position(&self) -> Result<CursorPosition, ProbeError> {
        Err(ProbeError::Unsupported("pointer location"))
    }
}

#[derive(Debug, Default)]
pub struct UnsupportedWindowSource;

impl UnsupportedWindowSource {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSource for UnsupportedWindowSource {
    fn list_windows(&self) -> Result<Vec<WindowRect>, ProbeError> {
        Err(ProbeError::Unsupported("browser window enumeration"))
    }
}
