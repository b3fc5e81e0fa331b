//! Detect, dispatch, convert.

use crate::detect::{ExpectedFormat, FormatTag, RawMessage};
use crate::error::{ConversionError, Result};
use crate::formats::{ehr_json, fhir, hl7, plain_text, xml};
use crate::record::CanonicalRecord;

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Limits applied to a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Deepest XML element nesting accepted below `patient`, whose children
    /// are level 1. Enforced on the raw text before a tree is built.
    pub max_depth: usize,
    /// Reject inputs longer than this many bytes. `None` disables the check.
    pub max_input_len: Option<usize>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_len: None,
        }
    }
}

pub type ParseFn = fn(&str, &ConversionOptions) -> Result<CanonicalRecord>;

/// Parser responsible for `format`, or `None` for [`FormatTag::Unknown`].
pub fn parser_for(format: FormatTag) -> Option<ParseFn> {
    match format {
        FormatTag::Hl7 => Some(hl7::parse),
        FormatTag::Fhir => Some(fhir::parse),
        FormatTag::EhrJson => Some(ehr_json::parse),
        FormatTag::Xml => Some(xml::parse),
        FormatTag::PlainText => Some(plain_text::parse),
        FormatTag::Unknown => None,
    }
}

/// Convert `raw` with default options.
pub fn convert(raw: &str) -> Result<CanonicalRecord> {
    convert_with(raw, &ConversionOptions::default())
}

pub fn convert_with(raw: &str, options: &ConversionOptions) -> Result<CanonicalRecord> {
    let message = prepare(raw, options)?;
    dispatch(message, options)
}

/// Like [`convert_with`], but refuse messages whose detected format does not
/// belong to `expected`.
pub fn convert_expecting(
    raw: &str,
    expected: ExpectedFormat,
    options: &ConversionOptions,
) -> Result<CanonicalRecord> {
    let message = prepare(raw, options)?;
    if !message.format().satisfies(expected) {
        return Err(ConversionError::FormatMismatch {
            expected,
            detected: message.format(),
        });
    }
    dispatch(message, options)
}

fn prepare<'a>(raw: &'a str, options: &ConversionOptions) -> Result<RawMessage<'a>> {
    if let Some(limit) = options.max_input_len {
        if raw.len() > limit {
            return Err(ConversionError::InputTooLarge {
                len: raw.len(),
                limit,
            });
        }
    }

    let message = RawMessage::new(raw);
    tracing::debug!(format = %message.format(), len = raw.len(), "detected message format");
    Ok(message)
}

fn dispatch(message: RawMessage<'_>, options: &ConversionOptions) -> Result<CanonicalRecord> {
    let parse = parser_for(message.format())
        .ok_or(ConversionError::UnsupportedFormat(message.format()))?;
    let record = parse(message.text(), options)?;
    tracing::trace!(
        resource_type = %record.resource_type,
        related = record.related_fields.len(),
        "message converted"
    );
    Ok(record)
}
