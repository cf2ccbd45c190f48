//! Decoded transaction results and event logs.
//!
//! These mirror the shape the chain client hands over after decoding a
//! committed transaction: a result code plus one event log per message, each
//! log carrying typed events with string key/value attributes.

use serde::{Deserialize, Serialize};

/// A decoded transaction result from the chain stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResult {
  /// Chain execution code; zero means the transaction succeeded.
  pub code: u32,
  /// Transaction hash, hex-encoded by the decoder.
  #[serde(default)]
  pub hash: String,
  #[serde(default)]
  pub logs: Vec<EventLog>,
}

/// The event log of one message inside a transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
  #[serde(default)]
  pub events: Vec<Event>,
}

/// One structured event, scoped by type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub attributes: Vec<Attribute>,
}

/// A single key/value attribute of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
  pub key: String,
  pub value: String,
}

impl EventLog {
  /// All values for `key` under events of type `event_type`, in log order.
  pub fn values<'a>(&'a self, event_type: &str, key: &str) -> Vec<&'a str> {
    self
      .events
      .iter()
      .filter(|event| event.kind == event_type)
      .flat_map(|event| event.attributes.iter())
      .filter(|attr| attr.key == key)
      .map(|attr| attr.value.as_str())
      .collect()
  }

  /// The first value for `key` under events of type `event_type`, if any.
  pub fn value<'a>(&'a self, event_type: &str, key: &str) -> Option<&'a str> {
    self.values(event_type, key).into_iter().next()
  }
}
