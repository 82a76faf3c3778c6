//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber from the `[logging]` section.
//! `RUST_LOG` takes precedence over the configured level. Events go to
//! stderr, or are appended to the configured log file so cron-driven
//! captures leave a trace.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingConfig;

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let filter = format!(
        "{}={},hyper=warn,reqwest=warn,lofty=warn",
        env!("CARGO_CRATE_NAME"),
        config.level
    );
    EnvFilter::try_new(filter).context("Invalid log filter")
}

fn build_writer(config: &LoggingConfig) -> Result<BoxMakeWriter> {
    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

/// Initialize the logging system. Call once, at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let writer = build_writer(config)?;
    let ansi = config.file.is_none();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    let result = match config.format.as_str() {
        "json" => builder.json().flatten_event(true).try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
