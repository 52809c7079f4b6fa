//! Generic ingested events.
//!
//! Ingestion collaborators (webhook receivers, pub/sub subscribers, the
//! manual-trigger API) normalize whatever they receive into an [`Event`].
//! Everything downstream works from this shape; typed per-category views are
//! built by the trigger matchers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A normalized occurrence fed into the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub details: Option<EventDetails>,
    #[serde(default)]
    pub content: Map<String, Value>,
    /// The exact bytes received by the transport, used for signature checks.
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub event_id: Option<String>,
}

/// Transport details attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub request_headers: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Event {
    /// Create an event of the given category and source with structured content.
    pub fn new(
        category: impl Into<String>,
        source: impl Into<String>,
        content: Map<String, Value>,
    ) -> Self {
        Self {
            details: Some(EventDetails {
                source: Some(source.into()),
                event_type: Some(category.into()),
                ..Default::default()
            }),
            content,
            ..Default::default()
        }
    }

    /// Attach the raw payload as received by the transport.
    pub fn with_raw_content(mut self, raw: impl Into<String>) -> Self {
        self.raw_content = Some(raw.into());
        self
    }

    /// Attach a request header. Repeated calls with the same name append values.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let details = self.details.get_or_insert_with(EventDetails::default);
        details
            .request_headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// The event category (`details.type`), if present.
    pub fn category(&self) -> Option<&str> {
        self.details.as_ref()?.event_type.as_deref()
    }

    /// The event source (`details.source`), if present.
    pub fn source(&self) -> Option<&str> {
        self.details.as_ref()?.source.as_deref()
    }

    /// First value of a request header. Header names are matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.details.as_ref()?.header(name)
    }
}

impl EventDetails {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.request_headers
            .keys()
            .any(|key| key.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let event = Event::new("git", "github", Map::new())
            .with_header("X-Hub-Signature", "sha1=abc")
            .with_header("X-Hub-Signature", "sha1=def");

        assert_eq!(event.header("x-hub-signature"), Some("sha1=abc"));
        assert!(event.details.as_ref().unwrap().has_header("X-HUB-SIGNATURE"));
        assert_eq!(event.header("X-Other"), None);
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let event: Event = serde_json::from_value(json!({
            "details": {
                "source": "github",
                "type": "git",
                "requestHeaders": { "X-Hub-Signature": ["sha1=00"] }
            },
            "content": { "slug": "repo" },
            "rawContent": "{}",
            "eventId": "evt-1"
        }))
        .unwrap();

        assert_eq!(event.category(), Some("git"));
        assert_eq!(event.source(), Some("github"));
        assert_eq!(event.raw_content.as_deref(), Some("{}"));
        assert_eq!(event.event_id.as_deref(), Some("evt-1"));
        assert_eq!(event.content["slug"], json!("repo"));
    }

    #[test]
    fn test_missing_details() {
        let event = Event::default();
        assert_eq!(event.category(), None);
        assert_eq!(event.header("anything"), None);
    }
}
