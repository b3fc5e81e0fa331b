//! Per-format parsers.
//!
//! Every parser has the same shape, `fn(&str, &ConversionOptions) ->
//! Result<CanonicalRecord>`, and ends in [`CanonicalRecord::build`].
//!
//! [`CanonicalRecord::build`]: crate::record::CanonicalRecord::build

pub mod ehr_json;
pub mod fhir;
pub mod hl7;
pub mod plain_text;
pub mod xml;

use serde_json::{Map, Value};

use crate::detect::FormatTag;
use crate::error::{ConversionError, Result};
use crate::record::RelatedFields;

/// Decode `raw` and require a top-level object.
pub(crate) fn json_object(raw: &str, format: FormatTag) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(ConversionError::MalformedStructure {
            format,
            reason: "expected a JSON object".to_string(),
        }),
    }
}

/// Text of a JSON scalar. Objects, arrays and null have none.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Shallow copy of every entry not listed in `consumed`.
pub(crate) fn related_from_object(obj: &Map<String, Value>, consumed: &[&str]) -> RelatedFields {
    obj.iter()
        .filter(|(key, _)| !consumed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone().into()))
        .collect()
}
