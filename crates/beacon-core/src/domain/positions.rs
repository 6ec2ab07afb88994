//! Per-tick payload computation and wire encoding.
//!
//! One [`BroadcastMessage`] is produced per enumerated window, in enumeration
//! order.  The whole sequence is serialized once per tick into a JSON array
//! and the same bytes are written to every subscriber.
//!
//! # Coordinate formulas
//!
//! ```text
//! x     = cursor.x - window.x
//! y     = cursor.y - window.y - chrome_offset_y
//! gridX = -window.x
//! gridY = -window.y - chrome_offset_y
//! ```
//!
//! `chrome_offset_y` is the fixed height of the browser's toolbar area, so
//! `y` and `gridY` are relative to the page viewport rather than the window
//! frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{CursorPosition, WindowRect};

/// Error returned when the payload cannot be serialized.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to serialize broadcast payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The pointer position relative to one window, as sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Title of the source window.
    pub id: String,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "gridX")]
    pub grid_x: i32,
    #[serde(rename = "gridY")]
    pub grid_y: i32,
}

impl BroadcastMessage {
    /// Computes the message for a single window.
    pub fn for_window(cursor: CursorPosition, window: &WindowRect, chrome_offset_y: i32) -> Self {
        let viewport_top = window.y.saturating_add(chrome_offset_y);
        Self {
            id: window.title.clone(),
            x: cursor.x.saturating_sub(window.x),
            y: cursor.y.saturating_sub(viewport_top),
            grid_x: window.x.saturating_neg(),
            grid_y: viewport_top.saturating_neg(),
        }
    }
}

/// Computes one message per window, preserving the order of `windows`.
///
/// Duplicate titles are kept as separate entries.
pub fn compute_positions(
    cursor: CursorPosition,
    windows: &[WindowRect],
    chrome_offset_y: i32,
) -> Vec<BroadcastMessage> {
    windows
        .iter()
        .map(|window| BroadcastMessage::for_window(cursor, window, chrome_offset_y))
        .collect()
}

/// Serializes a tick's messages to the JSON text frame sent to subscribers.
///
/// An empty slice encodes as `[]`.
///
/// # Errors
///
/// Returns [`PayloadError::Serialize`] if `serde_json` fails, which does not
/// happen for well-formed messages.
pub fn encode_payload(messages: &[BroadcastMessage]) -> Result<String, PayloadError> {
    Ok(serde_json::to_string(messages)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
