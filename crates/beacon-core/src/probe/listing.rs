//! Parser for the window listing printed by the browser scripting bridge.
//!
//! The script prints one line per window:
//!
//! ```text
//! <title>|<left>,<top>,<right>,<bottom>
//! ```
//!
//! The title is everything before the first `|`, so titles containing commas
//! survive intact.  Lines that do not match, or whose rectangle is empty, are
//! skipped silently.

use tracing::trace;

use crate::domain::geometry::WindowRect;

/// Parses the full stdout of the listing script.
///
/// # Example
///
/// ```rust
/// use beacon_core::probe::listing::parse_window_listing;
///
/// let windows = parse_window_listing("Inbox|0,25,1280,800\n\n");
/// assert_eq!(windows.len(), 1);
/// assert_eq!(windows[0].height, 775);
/// ```
pub fn parse_window_listing(output: &str) -> Vec<WindowRect> {
    output.lines().filter_map(parse_window_line).collect()
}

/// Parses a single listing line, returning `None` for anything unusable.
pub fn parse_window_line(line: &str) -> Option<WindowRect> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some((title, coords)) = line.split_once('|') else {
        trace!("skipping window line without separator: {line:?}");
        return None;
    };

    let parts: Vec<&str> = coords.split(',').collect();
    let [left, top, right, bottom] = parts.as_slice() else {
        trace!("skipping window line with {} coordinates", parts.len());
        return None;
    };

    let left = left.trim().parse::<i32>().ok()?;
    let top = top.trim().parse::<i32>().ok()?;
    let right = right.trim().parse::<i32>().ok()?;
    let bottom = bottom.trim().parse::<i32>().ok()?;

    WindowRect::from_bounds(title, left, top, right, bottom)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
