//! Single FHIR resources in JSON.
//!
//! The resource carries no vitals and no hospital, so both are always
//! placeholders.

use serde_json::Value;

use crate::detect::FormatTag;
use crate::error::Result;
use crate::formats::{json_object, related_from_object, scalar_text};
use crate::pipeline::ConversionOptions;
use crate::record::{CanonicalRecord, FieldDefaults, PersonDraft, UNKNOWN};

pub const HOSPITAL_PLACEHOLDER: &str = "FHIR Hospital";

const CONSUMED: [&str; 4] = ["resourceType", "name", "gender", "birthDate"];

const DEFAULTS: FieldDefaults = FieldDefaults {
    hospital: HOSPITAL_PLACEHOLDER,
    ..FieldDefaults::UNKNOWN
};

pub fn parse(raw: &str, _options: &ConversionOptions) -> Result<CanonicalRecord> {
    let resource = json_object(raw, FormatTag::Fhir)?;

    let resource_type = resource
        .get("resourceType")
        .and_then(scalar_text)
        .unwrap_or_else(|| UNKNOWN.to_string());

    let name = resource
        .get("name")
        .and_then(Value::as_array)
        .and_then(|names| names.first());

    let person = PersonDraft {
        first_name: name
            .and_then(|n| n.get("given"))
            .and_then(Value::as_array)
            .and_then(|given| given.first())
            .and_then(scalar_text),
        last_name: name.and_then(|n| n.get("family")).and_then(scalar_text),
        gender: resource.get("gender").and_then(scalar_text),
        date_of_birth: resource.get("birthDate").and_then(scalar_text),
        vitals: None,
    }
    .or_defaults(&DEFAULTS);

    Ok(CanonicalRecord::build(
        resource_type,
        DEFAULTS.hospital,
        person,
        related_from_object(&resource, &CONSUMED),
    ))
}
