//! The payload routed by the [`EventBus`](crate::event_bus::EventBus).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed, timestamped event.
///
/// `data` and `metadata` are opaque to the runtime; no schema is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Routing key: the bus delivers the event to the channel of this type.
  #[serde(rename = "type")]
  pub event_type: String,
  #[serde(default)]
  pub data: serde_json::Value,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
  /// Create an event stamped with the current time.
  pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
    Self {
      event_type: event_type.into(),
      data,
      timestamp: Utc::now(),
      metadata: HashMap::new(),
    }
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }

  pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
    self.timestamp = timestamp;
    self
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[rxbus_macro::test]
  fn test_builder() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let event = Event::new("task.created", serde_json::json!({"id": 7}))
      .with_metadata("source", serde_json::json!("api"))
      .with_timestamp(at);

    assert_eq!(event.event_type, "task.created");
    assert_eq!(event.data["id"], 7);
    assert_eq!(event.metadata["source"], "api");
    assert_eq!(event.timestamp, at);
  }

  #[rxbus_macro::test]
  fn test_serde_uses_type_key() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let event = Event::new("plan.deleted", serde_json::Value::Null).with_timestamp(at);

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "plan.deleted");
    assert!(json.get("metadata").is_none());

    let back: Event = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
  }
}
