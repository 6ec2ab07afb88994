//! Host-screen geometry sampled on every broadcast tick.
//!
//! All coordinates are host-screen pixels with the origin at the top-left of
//! the primary display.  Nothing here is persisted; each tick produces fresh
//! values.

use serde::{Deserialize, Serialize};

/// The pointer location in host-screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: i32,
    pub y: i32,
}

impl CursorPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounding box of one visible browser window.
///
/// `width` and `height` are always strictly positive: [`WindowRect::from_bounds`]
/// refuses degenerate rectangles, and the window probes only surface values
/// built through it.
///
/// Windows are identified by `title` alone.  Two windows with the same title
/// are both kept and are indistinguishable to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRect {
    pub title: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowRect {
    /// Builds a rectangle from its left/top/right/bottom edges.
    ///
    /// Returns `None` when the resulting width or height is zero or negative.
    ///
    /// # Example
    ///
    /// ```rust
    /// use beacon_core::WindowRect;
    ///
    /// let rect = WindowRect::from_bounds("Docs", 10, 20, 110, 220).unwrap();
    /// assert_eq!((rect.width, rect.height), (100, 200));
    /// assert!(WindowRect::from_bounds("Empty", 10, 20, 10, 220).is_none());
    /// ```
    pub fn from_bounds(
        title: impl Into<String>,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> Option<Self> {
        let width = right.checked_sub(left)?;
        let height = bottom.checked_sub(top)?;
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Self {
            title: title.into(),
            x: left,
            y: top,
            width,
            height,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bounds_computes_width_and_height() {
        // Arrange / Act
        let rect = WindowRect::from_bounds("Inbox", 100, 50, 900, 650).expect("valid rect");

        // Assert
        assert_eq!(rect.title, "Inbox");
        assert_eq!((rect.x, rect.y), (100, 50));
        assert_eq!((rect.width, rect.height), (800, 600));
    }

    #[test]
    fn test_from_bounds_rejects_zero_width() {
        assert!(WindowRect::from_bounds("a", 10, 10, 10, 50).is_none());
    }

    #[test]
    fn test_from_bounds_rejects_negative_height() {
        assert!(WindowRect::from_bounds("a", 10, 60, 50, 50).is_none());
    }

    #[test]
    fn test_from_bounds_accepts_negative_origin() {
        // Windows dragged partly off-screen have negative origins.
        let rect = WindowRect::from_bounds("a", -200, -10, 300, 400).expect("valid rect");
        assert_eq!((rect.width, rect.height), (500, 410));
    }

    #[test]
    fn test_from_bounds_rejects_overflowing_span() {
        assert!(WindowRect::from_bounds("a", i32::MIN, 0, i32::MAX, 10).is_none());
    }
}
