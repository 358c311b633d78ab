//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inkcal_core::TracingOutputFormat;

/// inkcal - Push your calendar to an e-paper display
#[derive(Debug, Parser)]
#[command(name = "inkcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "INKCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    // --- Pipeline stages ---
    /// Send the existing condensed file instead of fetching
    #[arg(long, conflicts_with = "events_file")]
    pub skip_fetch: bool,

    /// Fetch and condense only, do not transmit
    #[arg(long)]
    pub no_send: bool,

    /// Condensed output file
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Read raw events from a saved calendarView response instead of Graph
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    // --- Calendar ---
    /// IANA timezone for condensed times (e.g. Europe/Berlin)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Number of days to fetch
    #[arg(long)]
    pub days: Option<u32>,

    // --- Transfer ---
    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum payload size in bytes
    #[arg(long)]
    pub max_payload: Option<usize>,

    /// Acknowledge every chunk
    #[arg(long)]
    pub force_ack: bool,

    /// Delay between chunks, in seconds
    #[arg(long)]
    pub chunk_delay: Option<f64>,

    // --- Discovery ---
    /// Advertised name prefix of the display
    #[arg(long)]
    pub name_prefix: Option<String>,

    /// Connect to this address without scanning
    #[arg(long)]
    pub address: Option<String>,

    /// Scan window, in seconds
    #[arg(long)]
    pub scan_timeout: Option<u64>,

    // --- Clock ---
    /// Send the current time before the calendar
    #[arg(long)]
    pub send_time: bool,

    /// Send only the current time
    #[arg(long, conflicts_with_all = ["skip_fetch", "no_send"])]
    pub time_only: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output formats selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => Self::Compact,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Json => Self::Json,
        }
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List advertising peripherals and mark the ones discovery would pick
    Scan,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
