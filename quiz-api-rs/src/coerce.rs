// quiz-api-rs/src/coerce.rs
//
// Coercion of model replies into result records.
//
// The model is prompted to answer in pseudo-JSON with single-quoted keys and
// values. Coercion runs in two stages: a purely syntactic quote normalization,
// then a strict JSON parse with per-field validation. Both failure modes keep
// the raw reply so callers can return it to the client and it shows up in
// logs next to the error.

use serde_json::{Map, Value};
use thiserror::Error;

/// Failure modes of reply coercion. Both variants carry the reply exactly as
/// the model produced it, before quote normalization.
#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("reply is not valid JSON after quote normalization")]
    InvalidFormat { raw: String },
    #[error("reply is missing one or more required fields")]
    IncompleteFields { raw: String },
}

impl CoercionError {
    /// The unmodified model reply that failed coercion.
    pub fn raw(&self) -> &str {
        match self {
            CoercionError::InvalidFormat { raw } => raw,
            CoercionError::IncompleteFields { raw } => raw,
        }
    }
}

/// Stage 1: replace every single quote with a double quote.
///
/// Deliberately naive. A reply that itself contains an apostrophe inside a
/// value comes out with unbalanced quoting and fails the parse in stage 2,
/// which is the wanted outcome: a corrupted reply must never coerce into a
/// silently wrong record.
pub fn normalize_quotes(raw: &str) -> String {
    raw.replace('\'', "\"")
}

/// Stage 2 on top of stage 1: parse the normalized reply as strict JSON and
/// pull out `required_fields` in order.
///
/// A field satisfies the record when it is a non-empty string (kept as-is) or
/// a JSON number (kept as its JSON text, so a bare `85` for a score still
/// works). Anything else - absent, empty, null, boolean, array, object -
/// fails with `IncompleteFields`. Fields outside `required_fields` are
/// dropped from the record.
pub fn coerce_to_record(
    raw: &str,
    required_fields: &[&str],
) -> Result<Map<String, Value>, CoercionError> {
    let normalized = normalize_quotes(raw);

    let parsed: Value = serde_json::from_str(&normalized).map_err(|e| {
        log::warn!("Reply failed strict JSON parse after normalization: {}", e);
        CoercionError::InvalidFormat { raw: raw.to_string() }
    })?;

    let mut record = Map::new();
    for field in required_fields {
        let value = match parsed.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
            Some(Value::Number(n)) => Value::String(n.to_string()),
            _ => {
                return Err(CoercionError::IncompleteFields { raw: raw.to_string() });
            }
        };
        record.insert((*field).to_string(), value);
    }

    Ok(record)
}
