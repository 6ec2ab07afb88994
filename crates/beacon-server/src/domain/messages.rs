//! Inbound client message schema.
//!
//! Subscribers may send a JSON object carrying an `id` string to label their
//! connection.  Every other field is ignored, and anything that is not such an
//! object is dropped without error.
//!
//! ```json
//! { "id": "left-monitor-tab" }
//! ```

use serde::Deserialize;

/// The only inbound message the server interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientAnnouncement {
    #[serde(default)]
    pub id: Option<String>,
}

impl ClientAnnouncement {
    /// Decodes a text or binary frame payload.
    ///
    /// Returns `None` unless the payload is a JSON object.  An object whose
    /// `id` is present but not a string is also rejected.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// The declared identifier, if it is a non-empty string.
    pub fn declared_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Extracts the client-declared id from a raw frame payload.
///
/// # Example
///
/// ```rust
/// use beacon_server::domain::messages::declared_client_id;
///
/// assert_eq!(declared_client_id(br#"{"id":"abc","extra":1}"#), Some("abc".to_string()));
/// assert_eq!(declared_client_id(br#"{"id":""}"#), None);
/// assert_eq!(declared_client_id(b"hello"), None);
/// ```
pub fn declared_client_id(payload: &[u8]) -> Option<String> {
    ClientAnnouncement::parse(payload)?
        .declared_id()
        .map(str::to_owned)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
