//! Run configuration.
//!
//! A [`RunConfig`] is captured once at pipeline start and stays immutable
//! for the whole run. It is owned by whatever outer surface resolves it (the
//! bundled CLI, or an embedding application) and consumed by the worker.

use crate::error::{LogPipeError, Result};
use crate::types::FieldKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default separator between CSV columns.
pub const DEFAULT_CSV_SEP: &str = ",";

/// Default interval between polls for appended bytes in follow mode.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How an accepted message (or window row) is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per message: wall-clock timestamp plus the message fields.
    #[default]
    Standard,
    /// One JSON object per message with `meta` and `data` sections.
    Json,
    /// One row per window emission; requires a non-empty type list.
    Csv,
    /// Re-emit the original framed bytes (timestamp prefix + raw payload).
    Binary,
}

impl FromStr for OutputFormat {
    type Err = LogPipeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(OutputFormat::Standard),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "binary" => Ok(OutputFormat::Binary),
            other => Err(LogPipeError::Config(format!(
                "Unknown output format '{}' (expected standard, json, csv or binary)",
                other
            ))),
        }
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Message types to keep. Empty means all types.
    pub types: Vec<String>,

    /// Optional boolean condition, evaluated by the codec per message.
    pub condition: Option<String>,

    /// Output rendering.
    pub format: OutputFormat,

    /// Raw CSV separator token. The literal `tab` maps to a horizontal tab.
    pub csv_sep: String,

    /// Protocol dialect identifier, resolved to a codec at startup.
    pub dialect: String,

    /// Skip over corrupted spans instead of aborting.
    pub robust: bool,

    /// Keep waiting for appended bytes at end of stream.
    pub follow: bool,

    /// The log has no 8-byte timestamp prefixes.
    pub no_timestamps: bool,

    /// Field whose change marks a new output row. `None` emits one row per
    /// accepted message.
    pub align: Option<FieldKey>,

    /// Emit the human-readable description block before the CSV header.
    pub description_section: bool,

    /// Poll interval for follow mode, in milliseconds.
    pub poll_interval_ms: u64,

    /// Output file. `None` writes to standard output.
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            condition: None,
            format: OutputFormat::Standard,
            csv_sep: DEFAULT_CSV_SEP.to_string(),
            dialect: "mock".to_string(),
            robust: false,
            follow: false,
            no_timestamps: false,
            align: None,
            description_section: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            output: None,
        }
    }
}

impl RunConfig {
    /// The effective column separator, with the `tab` alias resolved.
    pub fn separator(&self) -> String {
        if self.csv_sep == "tab" {
            "\t".to_string()
        } else {
            self.csv_sep.clone()
        }
    }

    /// Follow-mode poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
