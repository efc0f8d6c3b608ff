//! logpipe - Command-line entry point
//!
//! Thin controller around the pipeline worker: resolves CLI arguments into
//! a `RunConfig`, spawns the worker on its own thread, and drains the
//! progress/error channel until the run finishes. Ctrl-C clears the
//! worker's stop flag for cooperative shutdown (useful in follow mode).

use anyhow::{bail, Context};
use clap::Parser;
use logpipe_rs::{
    codec, worker, FieldKey, LogPipeError, OutputFormat, ProgressEvent, RunConfig,
    WorkerState,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Dump and reshape a framed telemetry log.
#[derive(Debug, Parser)]
#[command(name = "logpipe", version, about)]
struct Cli {
    /// Input log file
    log: PathBuf,

    /// Message types to keep (comma separated). Empty keeps all types.
    #[arg(long)]
    types: Option<String>,

    /// Select messages by condition, e.g. "IMU.ax > 100"
    #[arg(long)]
    condition: Option<String>,

    /// Output format: standard, json, csv or binary
    #[arg(long, default_value = "standard")]
    format: String,

    /// Separator between CSV columns. Use 'tab' for tabs.
    #[arg(long = "csv-sep", default_value = ",")]
    csv_sep: String,

    /// Protocol dialect
    #[arg(long, default_value = "mock")]
    dialect: String,

    /// Enable robust parsing (skip over bad data)
    #[arg(long)]
    robust: bool,

    /// Keep waiting for more data at end of file
    #[arg(short, long)]
    follow: bool,

    /// Log doesn't have timestamps
    #[arg(long = "no-timestamps")]
    no_timestamps: bool,

    /// Alignment field (TYPE.field): emit a row only when it changes
    #[arg(long)]
    align: Option<String>,

    /// Disable the CSV data description section
    #[arg(long = "no-description")]
    no_description: bool,

    /// Write output to the given file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(PathBuf, RunConfig)> {
        let align = match &self.align {
            None => None,
            Some(raw) => Some(FieldKey::parse(raw).ok_or_else(|| {
                LogPipeError::Config(format!(
                    "Alignment field '{}' is not of the form TYPE.field",
                    raw
                ))
            })?),
        };

        let config = RunConfig {
            types: self
                .types
                .as_deref()
                .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            condition: self.condition,
            format: self.format.parse::<OutputFormat>()?,
            csv_sep: self.csv_sep,
            dialect: self.dialect,
            robust: self.robust,
            follow: self.follow,
            no_timestamps: self.no_timestamps,
            align,
            description_section: !self.no_description,
            output: self.output,
            ..RunConfig::default()
        };
        Ok((self.log, config))
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging on stderr; stdout carries the formatted output.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (log_path, config) = Cli::parse().into_config()?;
    let codec = codec::resolve_dialect(&config.dialect)?;

    let input = File::open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;
    let total_bytes = input.metadata().ok().map(|m| m.len());

    let sink: Box<dyn Write + Send> = match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };

    let handle = worker::spawn(config, codec, Box::new(input), total_bytes, sink);

    let stop_flag = handle.stop_flag();
    ctrlc::set_handler(move || {
        tracing::info!("Interrupt received, stopping");
        stop_flag.store(false, Ordering::SeqCst);
    })
    .context("Failed to install interrupt handler")?;

    // Drain the event channel until the worker drops its sender. An empty
    // channel only means the worker is still running.
    for event in handle.events().iter() {
        match event {
            ProgressEvent::Progress(percent) => {
                tracing::debug!("Progress: {}%", percent);
            }
            ProgressEvent::Error(message) => {
                tracing::error!("{}", message);
            }
        }
    }

    match handle.join() {
        WorkerState::Completed => Ok(()),
        state => bail!("run finished in state {:?}", state),
    }
}
