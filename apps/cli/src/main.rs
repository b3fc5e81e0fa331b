//! Tessera CLI - converts one healthcare message into a canonical JSON record.
//!
//! The record is printed to stdout. A message that cannot be converted prints
//! `{"error": "..."}` instead and exits with status 2; configuration and I/O
//! failures exit with status 1.

#![forbid(unsafe_code)]

mod config;
mod logging;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use serde_json::Value;
use tessera_interop::{convert_expecting, convert_with};

use crate::config::Cli;

const EXIT_CONVERSION_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::init();
    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            if tracing::enabled!(tracing::Level::ERROR) {
                tracing::error!(error = %format!("{error:#}"), "tessera terminated with error");
            } else {
                eprintln!("Error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    cli.validate().context("invalid configuration")?;
    let _logging_guard =
        logging::init_logging(&cli.logging).context("failed to initialize logging")?;

    let raw = read_input(cli.input_path(), cli.conversion.max_input_bytes)?;
    let options = cli.conversion.options();

    let outcome = match cli.conversion.expect {
        Some(expected) => convert_expecting(&raw, expected, &options),
        None => convert_with(&raw, &options),
    };

    match outcome {
        Ok(record) => {
            tracing::info!(
                resource_type = %record.resource_type,
                hospital = %record.hospital_identifier,
                related_fields = record.related_fields.len(),
                "Message converted"
            );
            let value = serde_json::to_value(&record).context("failed to serialize record")?;
            write_json(&value, cli.output.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::warn!(kind = ?error.kind(), error = %error, "Conversion failed");
            write_json(&error.to_json(), cli.output.pretty)?;
            Ok(ExitCode::from(EXIT_CONVERSION_FAILED))
        }
    }
}

/// Read at most `limit + 1` bytes, so oversized input is still reported by the
/// converter's own size check.
fn read_input(path: Option<&Path>, limit: usize) -> anyhow::Result<String> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    match path {
        Some(path) => File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .take(cap)
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => io::stdin()
            .lock()
            .take(cap)
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?,
    };

    tracing::debug!(bytes = bytes.len(), source = ?path, "Input read");
    if bytes.len() > limit {
        // The cut may split a character; the size check rejects it regardless.
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }
    String::from_utf8(bytes).context("input is not valid UTF-8")
}

fn write_json(value: &Value, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tessera-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_file_within_limit() {
        let path = sample_file("small.txt", "FirstName: Ann\n");
        let raw = read_input(Some(path.as_path()), 1024).unwrap();
        assert_eq!(raw, "FirstName: Ann\n");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn oversized_input_is_left_for_the_converter_to_reject() {
        let path = sample_file("large.txt", "FirstName: Ann\nLastName: Lee\n");
        let raw = read_input(Some(path.as_path()), 8).unwrap();
        assert_eq!(raw.len(), 9);

        let options = tessera_interop::ConversionOptions {
            max_input_len: Some(8),
            ..Default::default()
        };
        let err = convert_with(&raw, &options).unwrap_err();
        assert_eq!(err.kind(), tessera_interop::ErrorKind::MalformedInput);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("tessera-cli-does-not-exist.hl7");
        assert!(read_input(Some(path.as_path()), 1024).is_err());
    }
}
