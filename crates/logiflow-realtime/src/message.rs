//! Inbound topic message envelope.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `type` value given to bodies that are not a message envelope.
pub const RAW_TYPE: &str = "raw";

/// A message delivered on a subscribed topic.
///
/// The realtime service publishes `{type, payload, timestamp}` envelopes.
/// Anything else (plain text, bare domain events) is wrapped as a `raw`
/// message whose payload is the body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event type, e.g. `PEDIDO_CREADO`, `pong`, or [`RAW_TYPE`].
    #[serde(rename = "type")]
    pub message_type: String,
    /// Event data.
    pub payload: Value,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl Message {
    /// Interpret a MESSAGE frame body. Never fails.
    ///
    /// An object with a string `type` is an envelope. When it has no
    /// `payload`, the remaining fields become the payload. Numeric
    /// timestamps are epoch milliseconds.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) if map.get("type").is_some_and(Value::is_string) => {
                Self::from_envelope(map)
            }
            _ => Self::raw(body),
        }
    }

    /// Wrap an arbitrary body.
    pub fn raw(body: &str) -> Self {
        Self {
            message_type: RAW_TYPE.to_string(),
            payload: Value::String(body.to_string()),
            timestamp: now_rfc3339(),
        }
    }

    /// Whether this message was not an envelope.
    pub fn is_raw(&self) -> bool {
        self.message_type == RAW_TYPE && self.payload.is_string()
    }

    /// The payload as JSON. A raw body holding valid JSON is parsed;
    /// any other raw body stays a string.
    pub fn payload_json(&self) -> Cow<'_, Value> {
        match &self.payload {
            Value::String(text) if self.is_raw() => serde_json::from_str(text)
                .map(Cow::Owned)
                .unwrap_or(Cow::Borrowed(&self.payload)),
            other => Cow::Borrowed(other),
        }
    }

    /// Deserialize the payload into a domain type.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.payload_json().into_owned()).ok()
    }

    fn from_envelope(mut map: Map<String, Value>) -> Self {
        let message_type = match map.remove("type") {
            Some(Value::String(t)) => t,
            _ => RAW_TYPE.to_string(),
        };
        let timestamp = match map.remove("timestamp") {
            Some(Value::String(ts)) => ts,
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(now_rfc3339),
            _ => now_rfc3339(),
        };
        let payload = match map.remove("payload") {
            Some(payload) => payload,
            None if map.is_empty() => Value::Null,
            None => Value::Object(map),
        };

        Self {
            message_type,
            payload,
            timestamp,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
