//! Normalization of heterogeneous healthcare messages into one canonical record.
//!
//! Supported inputs:
//! - pipe-delimited HL7 v2 segment messages (`MSH|...`),
//! - FHIR resources in JSON (`{"resourceType": ...}`),
//! - nested EHR exports in JSON (`{"hospitalName": ..., "patient": {...}}`),
//! - element-tree EHR exports in XML,
//! - `Key: Value` plain text.
//!
//! ```
//! let record = tessera_interop::convert("FirstName: Ann\nHospital: General").unwrap();
//! assert_eq!(record.person.first_name, "Ann");
//! assert_eq!(record.hospital_identifier, "General");
//! ```
//!
//! Everything here is pure and synchronous. Absent fields resolve to
//! `"Unknown"` (or `"Not Provided"` where a format says so); only undetectable
//! or structurally broken input produces a [`ConversionError`].

#![forbid(unsafe_code)]

pub mod detect;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod record;

pub use detect::{detect, ExpectedFormat, FormatTag, ParseFormatError, RawMessage};
pub use error::{ConversionError, ErrorKind, Result};
pub use pipeline::{
    convert, convert_expecting, convert_with, parser_for, ConversionOptions, ParseFn,
    DEFAULT_MAX_DEPTH,
};
pub use record::{
    CanonicalRecord, FieldDefaults, FieldValue, PersonData, PersonDraft, RelatedFields,
    NOT_PROVIDED, STATUS_GENERATED, UNKNOWN,
};
