//! Notice Envelope codec - decoding records read back from a notice stream
//!
//! Records come from outside the process, so every helper here that answers
//! a narrow question ("is this a Tunnels notice, and what is its count?")
//! fails closed with `None` instead of an error.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use super::types::{Notice, NoticeKind};
use crate::error::DecodeError;

/// One decoded record; `data` is kept in its serialized form
///
/// Missing top-level fields decode to zero values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoticeEnvelope {
    pub notice_type: String,
    pub show_user: bool,
    pub data: Option<Box<RawValue>>,
    pub timestamp: String,
}

/// Decode the envelope of a single record (without its delimiter)
pub fn decode_envelope(record: &[u8]) -> Result<NoticeEnvelope, DecodeError> {
    Ok(serde_json::from_slice(record)?)
}

/// Decode what can be salvaged from a record whose envelope is invalid
///
/// A record that is a JSON object keeps every top-level field of the right
/// type; a field of the wrong type is left zero valued. Anything else yields
/// an all-empty envelope.
pub fn recover_envelope(record: &[u8]) -> NoticeEnvelope {
    if let Ok(envelope) = decode_envelope(record) {
        return envelope;
    }
    let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(record) else {
        return NoticeEnvelope::default();
    };

    let mut text = |name: &str| match fields.remove(name) {
        Some(Value::String(value)) => value,
        _ => String::new(),
    };
    let notice_type = text("noticeType");
    let timestamp = text("timestamp");
    NoticeEnvelope {
        notice_type,
        show_user: fields.get("showUser").and_then(Value::as_bool).unwrap_or_default(),
        data: fields
            .get("data")
            .filter(|data| !data.is_null())
            .and_then(|data| serde_json::value::to_raw_value(data).ok()),
        timestamp,
    }
}

impl NoticeEnvelope {
    /// The kind, if it is one this build knows
    pub fn kind(&self) -> Option<NoticeKind> {
        self.notice_type.parse().ok()
    }

    /// The payload exactly as it appeared on the wire, or "" if absent
    pub fn raw_payload(&self) -> &str {
        self.data.as_deref().map(RawValue::get).unwrap_or("")
    }

    /// Decode the payload into the typed notice for its kind
    pub fn decode_notice(&self) -> Result<Notice, DecodeError> {
        let kind: NoticeKind = self.notice_type.parse()?;
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| DecodeError::MissingPayload(self.notice_type.clone()))?;
        let payload: Value = serde_json::from_str(data.get())?;
        let tagged = serde_json::json!({
            "noticeType": kind.as_str(),
            "data": payload,
        });
        Ok(serde_json::from_value(tagged)?)
    }

    /// Extract one payload field, only when the record is of the expected kind
    pub fn field<T: DeserializeOwned>(&self, expected: NoticeKind, name: &str) -> Option<T> {
        if self.notice_type != expected.as_str() {
            return None;
        }
        let data = self.data.as_deref()?;
        let mut payload: Map<String, Value> = serde_json::from_str(data.get()).ok()?;
        serde_json::from_value(payload.remove(name)?).ok()
    }
}

/// Extract one payload field from raw record bytes
///
/// Returns `None` on malformed input, a kind mismatch, a missing field, or a
/// value of the wrong type.
pub fn extract_field<T: DeserializeOwned>(record: &[u8], expected: NoticeKind, name: &str) -> Option<T> {
    decode_envelope(record).ok()?.field(expected, name)
}

/// Extract `count` from a `Tunnels` record
///
/// 0 means disconnected, 1 or more means connected. Any other record yields `None`.
pub fn extract_tunnel_count(record: &[u8]) -> Option<usize> {
    extract_field(record, NoticeKind::Tunnels, "count")
}
