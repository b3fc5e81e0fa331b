//! Colon-delimited `Key: Value` text.
//!
//! Keys are matched exactly (case-sensitive). Lines without a colon are
//! ignored; a key seen twice keeps its last value.

use crate::error::Result;
use crate::pipeline::ConversionOptions;
use crate::record::{CanonicalRecord, FieldDefaults, FieldValue, PersonDraft, RelatedFields};

pub const RESOURCE_TYPE: &str = "PlainText";

const DEFAULTS: FieldDefaults = FieldDefaults::UNKNOWN;

pub fn parse(raw: &str, _options: &ConversionOptions) -> Result<CanonicalRecord> {
    let mut person = PersonDraft::default();
    let mut hospital = None;
    let mut related = RelatedFields::new();

    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim().to_string());
        match key {
            "FirstName" => person.first_name = Some(value),
            "LastName" => person.last_name = Some(value),
            "Gender" => person.gender = Some(value),
            "DOB" => person.date_of_birth = Some(value),
            "Vitals" => person.vitals = Some(value),
            "Hospital" => hospital = Some(value),
            _ => {
                related.insert(key.to_string(), FieldValue::Text(value));
            }
        }
    }

    Ok(CanonicalRecord::build(
        RESOURCE_TYPE,
        DEFAULTS.hospital_or_default(hospital),
        person.or_defaults(&DEFAULTS),
        related,
    ))
}
