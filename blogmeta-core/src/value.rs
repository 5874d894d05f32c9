//! Option values and the payload codec used at the overlay boundary.
//!
//! Option values are opaque to the sync engine. Plain strings cross into the
//! overlay untouched, so payloads written by the engine and by the host
//! itself look the same. Every other value is stored as JSON behind
//! [`PAYLOAD_MARKER`], and [`decode_payload`] only parses text carrying it.

use crate::{CodecError, ManagedKey, MetaResult};

/// A configuration value as seen by the host.
pub type OptionValue = serde_json::Value;

/// Prefix of payloads holding a JSON encoded value.
pub const PAYLOAD_MARKER: &str = "json:";

/// Serialize a value for storage in the overlay.
///
/// Strings are stored as they are, unless they start with the marker
/// themselves; those are wrapped like any structured value.
pub fn encode_payload(key: &ManagedKey, value: &OptionValue) -> MetaResult<String> {
    if let OptionValue::String(s) = value {
        if !s.starts_with(PAYLOAD_MARKER) {
            return Ok(s.clone());
        }
    }
    let json = serde_json::to_string(value).map_err(|e| CodecError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(format!("{PAYLOAD_MARKER}{json}"))
}

/// Deserialize an overlay payload. Never fails.
///
/// Unmarked text, and marked text that is not valid JSON, come back as the
/// raw string.
pub fn decode_payload(payload: &str) -> OptionValue {
    payload
        .strip_prefix(PAYLOAD_MARKER)
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_else(|| OptionValue::String(payload.to_string()))
}

/// Host emptiness: null, false, zero, "", "0" and empty collections.
///
/// Empty values are never written to the overlay by read-through population
/// or migration.
pub fn is_empty_value(value: &OptionValue) -> bool {
    match value {
        OptionValue::Null => true,
        OptionValue::Bool(b) => !b,
        OptionValue::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        OptionValue::String(s) => s.is_empty() || s == "0",
        OptionValue::Array(items) => items.is_empty(),
        OptionValue::Object(map) => map.is_empty(),
    }
}

/// Strip trailing forward and back slashes from string values.
pub fn untrailing_slash(value: OptionValue) -> OptionValue {
    match value {
        OptionValue::String(s) => {
            OptionValue::String(s.trim_end_matches(['/', '\\']).to_string())
        }
        other => other,
    }
}
