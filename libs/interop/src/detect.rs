//! Wire-format classification.
//!
//! Detection is a chain of cheap syntactic probes. The order matters: the
//! categories overlap (an HL7 timestamp contains `:`, most JSON does too), so
//! the first probe that matches wins.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Segment tag every pipe-delimited message starts with.
pub const HL7_HEADER_TAG: &str = "MSH";

/// Top-level keys that mark a JSON object as a nested EHR export.
pub const EHR_MARKER_KEYS: [&str; 3] = ["hospitalName", "EMRType", "hospital"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Hl7,
    Fhir,
    EhrJson,
    Xml,
    PlainText,
    Unknown,
}

impl FormatTag {
    pub const ALL: [FormatTag; 6] = [
        FormatTag::Hl7,
        FormatTag::Fhir,
        FormatTag::EhrJson,
        FormatTag::Xml,
        FormatTag::PlainText,
        FormatTag::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatTag::Hl7 => "HL7",
            FormatTag::Fhir => "FHIR",
            FormatTag::EhrJson => "EHR_JSON",
            FormatTag::Xml => "XML",
            FormatTag::PlainText => "PlainText",
            FormatTag::Unknown => "Unknown",
        }
    }

    /// Whether this detected format is acceptable when `expected` was requested.
    pub fn satisfies(self, expected: ExpectedFormat) -> bool {
        matches!(
            (expected, self),
            (ExpectedFormat::Hl7, FormatTag::Hl7)
                | (ExpectedFormat::Fhir, FormatTag::Fhir)
                | (ExpectedFormat::Ehr, FormatTag::EhrJson | FormatTag::Xml)
                | (ExpectedFormat::PlainText, FormatTag::PlainText)
        )
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format name '{0}'")]
pub struct ParseFormatError(pub String);

impl FromStr for FormatTag {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

/// A format family a caller may insist on before converting.
///
/// `Ehr` covers both EHR encodings, JSON and XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedFormat {
    Hl7,
    Fhir,
    Ehr,
    PlainText,
}

impl fmt::Display for ExpectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpectedFormat::Hl7 => "HL7",
            ExpectedFormat::Fhir => "FHIR",
            ExpectedFormat::Ehr => "EHR (JSON/XML)",
            ExpectedFormat::PlainText => "Plain Text",
        })
    }
}

impl FromStr for ExpectedFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "hl7" => Ok(ExpectedFormat::Hl7),
            "fhir" => Ok(ExpectedFormat::Fhir),
            "ehr" | "ehrjson" | "ehrxml" | "ehrjsonxml" => Ok(ExpectedFormat::Ehr),
            "plaintext" | "text" => Ok(ExpectedFormat::PlainText),
            _ => Err(ParseFormatError(s.to_string())),
        }
    }
}

/// Classify `raw`. Total and pure: every input maps to exactly one tag.
pub fn detect(raw: &str) -> FormatTag {
    if raw.trim().starts_with(HL7_HEADER_TAG) {
        return FormatTag::Hl7;
    }

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        if obj.contains_key("resourceType") {
            return FormatTag::Fhir;
        }
        if EHR_MARKER_KEYS.iter().any(|key| obj.contains_key(*key)) {
            return FormatTag::EhrJson;
        }
    }

    if raw.contains('<') && raw.contains('>') {
        FormatTag::Xml
    } else if raw.contains(':') {
        FormatTag::PlainText
    } else {
        FormatTag::Unknown
    }
}

/// The input text paired with its detected format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage<'a> {
    text: &'a str,
    format: FormatTag,
}

impl<'a> RawMessage<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            format: detect(text),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }
}
