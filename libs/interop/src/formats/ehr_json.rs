//! Generic nested EHR exports in JSON.
//!
//! ```json
//! { "hospitalName": "General",
//!   "patient": { "patientName": {"given": "Ann", "family": "Lee"},
//!                "gender": "female", "birthDate": "1970-01-01", ... } }
//! ```

use serde_json::Value;

use crate::detect::FormatTag;
use crate::error::{ConversionError, Result};
use crate::formats::{json_object, related_from_object, scalar_text};
use crate::pipeline::ConversionOptions;
use crate::record::{
    CanonicalRecord, FieldDefaults, PersonDraft, RelatedFields, NOT_PROVIDED,
};

pub const RESOURCE_TYPE: &str = "EHR_JSON";

const HOSPITAL_KEY: &str = "hospitalName";
const PATIENT_KEY: &str = "patient";
const CONSUMED: [&str; 3] = ["patientName", "gender", "birthDate"];

const DEFAULTS: FieldDefaults = FieldDefaults {
    vitals: NOT_PROVIDED,
    ..FieldDefaults::UNKNOWN
};

pub fn parse(raw: &str, _options: &ConversionOptions) -> Result<CanonicalRecord> {
    let export = json_object(raw, FormatTag::EhrJson)?;

    let patient = match export.get(PATIENT_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Object(obj)) => Some(obj),
        Some(_) => {
            return Err(ConversionError::MalformedStructure {
                format: FormatTag::EhrJson,
                reason: format!("`{PATIENT_KEY}` must be an object"),
            })
        }
    };

    let patient_name = patient.and_then(|p| p.get("patientName"));
    let person = PersonDraft {
        first_name: patient_name.and_then(|n| n.get("given")).and_then(name_part),
        last_name: patient_name.and_then(|n| n.get("family")).and_then(name_part),
        gender: patient.and_then(|p| p.get("gender")).and_then(scalar_text),
        date_of_birth: patient.and_then(|p| p.get("birthDate")).and_then(scalar_text),
        vitals: None,
    }
    .or_defaults(&DEFAULTS);

    let hospital = export.get(HOSPITAL_KEY).and_then(scalar_text);
    let related = patient
        .map(|p| related_from_object(p, &CONSUMED))
        .unwrap_or_else(RelatedFields::new);

    Ok(CanonicalRecord::build(
        RESOURCE_TYPE,
        DEFAULTS.hospital_or_default(hospital),
        person,
        related,
    ))
}

/// Name parts come either as a plain string or as a list whose first entry counts.
fn name_part(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(scalar_text),
        other => scalar_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, UNKNOWN};

    fn convert(raw: &str) -> Result<CanonicalRecord> {
        parse(raw, &ConversionOptions::default())
    }

    #[test]
    fn nested_patient() {
        let record = convert(
            r#"{"hospitalName":"General","patient":{"patientName":{"given":"Ann","family":"Lee"},
                "gender":"female","birthDate":"1970-01-01","mrn":"A-1","allergies":["penicillin"]}}"#,
        )
        .unwrap();
        assert_eq!(record.resource_type, RESOURCE_TYPE);
        assert_eq!(record.hospital_identifier, "General");
        assert_eq!(record.person.first_name, "Ann");
        assert_eq!(record.person.last_name, "Lee");
        assert_eq!(record.person.gender, "female");
        assert_eq!(record.person.date_of_birth, "1970-01-01");
        assert_eq!(record.person.vitals, NOT_PROVIDED);

        let keys: Vec<_> = record.related_fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["allergies", "mrn"]);
        assert_eq!(
            record.related_fields["allergies"],
            FieldValue::List(vec!["penicillin".into()])
        );
    }

    #[test]
    fn given_as_list() {
        let record =
            convert(r#"{"hospitalName":"H","patient":{"patientName":{"given":["Bo","Jo"]}}}"#)
                .unwrap();
        assert_eq!(record.person.first_name, "Bo");
        assert_eq!(record.person.last_name, UNKNOWN);
    }

    #[test]
    fn missing_patient_and_hospital() {
        let record = convert(r#"{"EMRType":"legacy"}"#).unwrap();
        assert_eq!(record.hospital_identifier, UNKNOWN);
        assert_eq!(record.person.first_name, UNKNOWN);
        assert!(record.related_fields.is_empty());
    }

    #[test]
    fn scalar_patient_is_malformed() {
        let err = convert(r#"{"hospitalName":"H","patient":"Ann Lee"}"#).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedStructure { .. }));
    }
}
