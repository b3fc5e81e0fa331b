//! Pipe-delimited segment messages (HL7 v2 style).
//!
//! Only the positions needed for the canonical record are interpreted:
//!
//! | target               | segment | field |
//! |----------------------|---------|-------|
//! | hospital identifier  | MSH     | 3     |
//! | last^first name      | PID     | 5     |
//! | date of birth        | PID     | 7     |
//! | gender               | PID     | 8     |
//! | vitals               | OBX     | 5     |
//!
//! Every segment other than PID and OBX is carried under `relatedFields`.

use std::collections::BTreeMap;

use crate::detect::HL7_HEADER_TAG;
use crate::error::{ConversionError, Result};
use crate::pipeline::ConversionOptions;
use crate::record::{CanonicalRecord, FieldDefaults, FieldValue, PersonDraft, RelatedFields};

pub const RESOURCE_TYPE: &str = "HL7";

const PATIENT_TAG: &str = "PID";
const OBSERVATION_TAG: &str = "OBX";

// MSH-1 is the field separator itself, so MSH-3 sits at split index 2.
const HEADER_SENDING_APPLICATION: usize = 2;
const PATIENT_NAME: usize = 5;
const PATIENT_BIRTH_DATE: usize = 7;
const PATIENT_SEX: usize = 8;
const OBSERVATION_VALUE: usize = 5;

const DEFAULTS: FieldDefaults = FieldDefaults::UNKNOWN;

/// Name components are always split on `^`, whatever MSH-2 declares.
const NAME_COMPONENT: char = '^';

/// Separators declared by the message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self { field: '|' }
    }
}

impl Delimiters {
    /// Read the field separator from an `MSH` line, falling back to `|`.
    pub fn from_header(line: &str) -> Self {
        line.strip_prefix(HL7_HEADER_TAG)
            .and_then(|rest| rest.chars().next())
            .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
            .map(|field| Self { field })
            .unwrap_or_default()
    }
}

/// One segment line split into positional fields; index 0 is the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Segment<'a> {
    pub fn tag(&self) -> &'a str {
        self.fields[0]
    }

    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `{"PV1_0": "PV1", "PV1_1": ..., ...}`
    pub fn to_field_map(&self) -> FieldValue {
        let tag = self.tag();
        FieldValue::Map(
            self.fields
                .iter()
                .enumerate()
                .map(|(i, value)| (format!("{tag}_{i}"), FieldValue::from(*value)))
                .collect(),
        )
    }
}

/// Segments grouped by tag, in message order within each tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentTable<'a> {
    delimiters: Delimiters,
    segments: BTreeMap<&'a str, Vec<Segment<'a>>>,
}

impl<'a> SegmentTable<'a> {
    pub fn parse(raw: &'a str) -> Result<Self> {
        let mut lines = raw
            .trim()
            .split(|c: char| c == '\r' || c == '\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .peekable();

        let delimiters = lines
            .peek()
            .map(|line| Delimiters::from_header(line))
            .unwrap_or_default();

        let mut segments: BTreeMap<&'a str, Vec<Segment<'a>>> = BTreeMap::new();
        for (idx, line) in lines.enumerate() {
            let mut fields: Vec<&'a str> = line.split(delimiters.field).collect();
            let tag = fields[0].trim();
            if tag.is_empty() {
                return Err(ConversionError::MalformedSegment {
                    segment: idx + 1,
                    reason: "segment has no tag",
                });
            }
            fields[0] = tag;
            segments.entry(tag).or_default().push(Segment { fields });
        }

        Ok(Self {
            delimiters,
            segments,
        })
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    pub fn first(&self, tag: &str) -> Option<&Segment<'a>> {
        self.occurrences(tag).first()
    }

    pub fn occurrences(&self, tag: &str) -> &[Segment<'a>] {
        self.segments.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[Segment<'a>])> + '_ {
        self.segments.iter().map(|(tag, segs)| (*tag, segs.as_slice()))
    }
}

pub fn parse(raw: &str, _options: &ConversionOptions) -> Result<CanonicalRecord> {
    let table = SegmentTable::parse(raw)?;

    let patient = table.first(PATIENT_TAG);
    let patient_field =
        |index: usize| patient.and_then(|pid| pid.field(index)).map(str::to_string);

    let (last_name, first_name) = patient
        .and_then(|pid| pid.field(PATIENT_NAME))
        .and_then(split_name)
        .unzip();

    let person = PersonDraft {
        first_name,
        last_name,
        gender: patient_field(PATIENT_SEX),
        date_of_birth: patient_field(PATIENT_BIRTH_DATE),
        vitals: table
            .first(OBSERVATION_TAG)
            .and_then(|obx| obx.field(OBSERVATION_VALUE))
            .map(str::to_string),
    }
    .or_defaults(&DEFAULTS);

    let hospital = table
        .first(HL7_HEADER_TAG)
        .and_then(|msh| msh.field(HEADER_SENDING_APPLICATION))
        .map(str::to_string);

    let related: RelatedFields = table
        .iter()
        .filter(|(tag, _)| *tag != PATIENT_TAG && *tag != OBSERVATION_TAG)
        .map(|(tag, segments)| {
            let list = segments.iter().map(Segment::to_field_map).collect();
            (tag.to_string(), FieldValue::List(list))
        })
        .collect();

    Ok(CanonicalRecord::build(
        RESOURCE_TYPE,
        DEFAULTS.hospital_or_default(hospital),
        person,
        related,
    ))
}

/// `"Last^First^Middle"` → `(Last, First)`. `None` without a `^`.
fn split_name(name: &str) -> Option<(String, String)> {
    let (last, rest) = name.split_once(NAME_COMPONENT)?;
    let first = rest.split(NAME_COMPONENT).next().unwrap_or_default();
    Some((last.to_string(), first.to_string()))
}
