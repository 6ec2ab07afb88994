//! macOS probes via Core Graphics and AppleScript.
//!
//! The pointer comes from a synthetic `CGEvent`'s location, which is already
//! in top-left-origin global display coordinates.  The window list comes from
//! asking Google Chrome for the title of each window's active tab and its
//! bounds, one `title|left,top,right,bottom` line per window.
//!
//! Running `osascript` requires the Automation permission for Chrome; until
//! it is granted every window query fails and ticks are skipped.

use beacon_core::probe::listing::parse_window_listing;
use beacon_core::{CursorPosition, PointerSource, ProbeError, WindowRect, WindowSource};
use core_graphics::event::CGEvent;
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

use super::run_helper;

const WINDOW_SCRIPT: &str = r#"
tell application "Google Chrome"
	set out to ""
	repeat with w in windows
		set theTitle to title of active tab of w
		set {leftPos, topPos, rightPos, bottomPos} to bounds of w
		set out to out & theTitle & "|" & leftPos & "," & topPos & "," & rightPos & "," & bottomPos & linefeed
	end repeat
	return out
end tell
"#;

/// Pointer location from Core Graphics.
#[derive(Debug, Default)]
pub struct MacosPointerSource;

impl MacosPointerSource {
    pub fn new() -> Self {
        Self
    }
}

impl PointerSource for MacosPointerSource {
    fn cursor_position(&self) -> Result<CursorPosition, ProbeError> {
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState)
            .map_err(|_| ProbeError::Platform("CGEventSourceCreate failed".to_string()))?;
        let event = CGEvent::new(source)
            .map_err(|_| ProbeError::Platform("CGEventCreate failed".to_string()))?;
        let point = event.location();
        // Truncate toward zero to whole pixels.
        Ok(CursorPosition::new(point.x as i32, point.y as i32))
    }
}

/// Chrome window list from `osascript`.
#[derive(Debug, Default)]
pub struct MacosWindowSource;

impl MacosWindowSource {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSource for MacosWindowSource {
    fn list_windows(&self) -> Result<Vec<WindowRect>, ProbeError> {
        let listing = run_helper("osascript", &["-e", WINDOW_SCRIPT])?;
        Ok(parse_window_listing(&listing))
    }
}
