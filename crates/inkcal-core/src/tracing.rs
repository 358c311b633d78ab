//! Log subscriber for the `inkcal` binary.
//!
//! Library crates only emit `tracing` events. User-facing progress lines are
//! printed directly and never go through the subscriber. `RUST_LOG`, when
//! set, replaces the level chosen from `--debug`.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Error)]
#[error("failed to set global tracing subscriber: {0}")]
pub struct TracingError(#[from] tracing::subscriber::SetGlobalDefaultError);

/// Log line layout, picked with `--log-format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    Pretty,
    #[default]
    Compact,
    /// One JSON object per line, for runs under a scheduler.
    Json,
}

/// How the subscriber is set up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracingConfig {
    /// Debug level plus source locations and targets, without timestamps.
    pub debug: bool,
    pub format: TracingOutputFormat,
}

impl TracingConfig {
    pub fn new(debug: bool, format: TracingOutputFormat) -> Self {
        Self { debug, format }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        if self.debug { "inkcal=debug" } else { "inkcal=warn" }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .with_target(config.debug)
        .with_file(config.debug)
        .with_line_number(config.debug);

    let layer = match config.format {
        TracingOutputFormat::Pretty => layer.pretty().boxed(),
        TracingOutputFormat::Json => layer.json().boxed(),
        TracingOutputFormat::Compact if config.debug => layer.compact().without_time().boxed(),
        TracingOutputFormat::Compact => layer.compact().boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(config.filter())
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
