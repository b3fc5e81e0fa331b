//! Canonical record model shared by every source format.
//!
//! Parsers collect what they find into a [`PersonDraft`], apply their own
//! [`FieldDefaults`] table and hand the result to [`CanonicalRecord::build`],
//! which is the only place a record is assembled.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_PROVIDED: &str = "Not Provided";
pub const STATUS_GENERATED: &str = "generated";

/// Source fields that were not mapped onto the person or hospital.
pub type RelatedFields = BTreeMap<String, FieldValue>;

/// A value carried under `relatedFields`.
///
/// Text-based formats only produce `Text`, `List` and `Map`; JSON sources keep
/// their scalar types.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<FieldValue>),
    Map(RelatedFields),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&RelatedFields> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => FieldValue::Number(n),
            Value::String(s) => FieldValue::Text(s),
            Value::Array(items) => FieldValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(obj) => {
                FieldValue::Map(obj.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// Per-format fallback values, used when a field is absent from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefaults {
    pub hospital: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub gender: &'static str,
    pub date_of_birth: &'static str,
    pub vitals: &'static str,
}

impl FieldDefaults {
    pub const UNKNOWN: Self = Self {
        hospital: UNKNOWN,
        first_name: UNKNOWN,
        last_name: UNKNOWN,
        gender: UNKNOWN,
        date_of_birth: UNKNOWN,
        vitals: UNKNOWN,
    };

    pub fn hospital_or_default(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| self.hospital.to_string())
    }
}

/// Person attributes as extracted, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub vitals: Option<String>,
}

impl PersonDraft {
    /// Fill every missing attribute from `defaults`.
    pub fn or_defaults(self, defaults: &FieldDefaults) -> Self {
        let fill = |value: Option<String>, default: &str| {
            Some(value.unwrap_or_else(|| default.to_string()))
        };
        Self {
            first_name: fill(self.first_name, defaults.first_name),
            last_name: fill(self.last_name, defaults.last_name),
            gender: fill(self.gender, defaults.gender),
            date_of_birth: fill(self.date_of_birth, defaults.date_of_birth),
            vitals: fill(self.vitals, defaults.vitals),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonData {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub gender: String,
    #[serde(rename = "DOB")]
    pub date_of_birth: String,
    #[serde(rename = "Vitals")]
    pub vitals: String,
}

impl From<PersonDraft> for PersonData {
    fn from(draft: PersonDraft) -> Self {
        let unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            first_name: unknown(draft.first_name),
            last_name: unknown(draft.last_name),
            gender: unknown(draft.gender),
            date_of_birth: unknown(draft.date_of_birth),
            vitals: unknown(draft.vitals),
        }
    }
}

/// The normalized output of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub resource_type: String,
    pub status: String,
    pub hospital_identifier: String,
    pub person: PersonData,
    pub related_fields: RelatedFields,
}

impl CanonicalRecord {
    /// Assemble a record. Any person attribute still missing becomes `"Unknown"`.
    pub fn build(
        resource_type: impl Into<String>,
        hospital_identifier: impl Into<String>,
        person: PersonDraft,
        related_fields: RelatedFields,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            status: STATUS_GENERATED.to_string(),
            hospital_identifier: hospital_identifier.into(),
            person: person.into(),
            related_fields,
        }
    }
}

#[derive(Serialize)]
struct Narrative<'a> {
    status: &'a str,
}

#[derive(Serialize)]
struct Hospital<'a> {
    identifier: Identifier<'a>,
}

#[derive(Serialize)]
struct Identifier<'a> {
    value: &'a str,
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("resourceType", &self.resource_type)?;
        map.serialize_entry(
            "text",
            &Narrative {
                status: &self.status,
            },
        )?;
        map.serialize_entry(
            "hospital",
            &Hospital {
                identifier: Identifier {
                    value: &self.hospital_identifier,
                },
            },
        )?;
        map.serialize_entry("person", &self.person)?;
        map.serialize_entry("relatedFields", &self.related_fields)?;
        map.end()
    }
}
