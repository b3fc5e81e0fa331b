//! CLI configuration.
//!
//! ```text
//! Cli
//! ├── input: Option<PathBuf>         # message file, stdin when absent or `-`
//! ├── conversion: ConversionConfig   # expected format, size and depth limits
//! ├── output: OutputConfig           # JSON formatting
//! └── logging: LoggingConfig         # level, format, optional rolling file
//! ```
//!
//! Every option can also be set through a `TESSERA_*` environment variable,
//! including variables loaded from a `.env` file.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use clap::{Args, Parser, ValueEnum};
use tessera_interop::{ConversionOptions, ExpectedFormat, DEFAULT_MAX_DEPTH};

pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "tessera")]
#[command(about = "Convert HL7, FHIR, EHR (JSON/XML) or plain-text messages into one canonical JSON record")]
#[command(version)]
pub struct Cli {
    /// Message file to convert. Reads stdin when omitted or `-`.
    #[arg(env = "TESSERA_INPUT")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub conversion: ConversionConfig,

    #[command(flatten)]
    pub output: OutputConfig,

    #[command(flatten)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Args)]
pub struct ConversionConfig {
    /// Refuse messages that are not of this format (hl7, fhir, ehr, plain-text).
    #[arg(long, env = "TESSERA_EXPECT")]
    pub expect: Option<ExpectedFormat>,

    /// Largest accepted message, in bytes.
    #[arg(long, env = "TESSERA_MAX_INPUT_BYTES", default_value_t = DEFAULT_MAX_INPUT_BYTES)]
    pub max_input_bytes: usize,

    /// Deepest XML element nesting flattened into related fields.
    #[arg(long, env = "TESSERA_MAX_DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl ConversionConfig {
    pub fn options(&self) -> ConversionOptions {
        ConversionOptions {
            max_depth: self.max_depth,
            max_input_len: Some(self.max_input_bytes),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct OutputConfig {
    /// Pretty-print the JSON result.
    #[arg(long, env = "TESSERA_PRETTY")]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogRotation {
    Daily,
    Hourly,
    Minutely,
    Never,
}

#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set.
    #[arg(long = "log-level", env = "TESSERA_LOG_LEVEL", default_value = "warn")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", env = "TESSERA_LOG_JSON")]
    pub json: bool,

    /// Also write logs to rolling files in this directory.
    #[arg(long = "log-dir", env = "TESSERA_LOG_DIR")]
    pub file_directory: Option<PathBuf>,

    #[arg(long = "log-file-prefix", env = "TESSERA_LOG_FILE_PREFIX", default_value = "tessera.log")]
    pub file_prefix: String,

    #[arg(long = "log-rotation", env = "TESSERA_LOG_ROTATION", value_enum, default_value_t = LogRotation::Daily)]
    pub file_rotation: LogRotation,
}

impl Cli {
    /// Load `.env` (if present), then parse arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                eprintln!("Warning: failed to load .env file: {err}");
            }
        }
    }

    /// Input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&Path> {
        self.input
            .as_deref()
            .filter(|path| path.as_os_str() != "-")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.conversion.max_input_bytes > 0,
            "max-input-bytes must be greater than zero"
        );
        ensure!(
            self.conversion.max_depth > 0,
            "max-depth must be greater than zero"
        );
        ensure!(
            !self.logging.file_prefix.trim().is_empty(),
            "log-file-prefix must not be empty"
        );
        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .with_context(|| format!("invalid log level '{}'", self.logging.level))?;
        Ok(())
    }
}
