//! CLI, configuration file and the fetch-condense-send pipeline.
//!
//! This crate provides the `inkcal` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod secret;
pub mod signals;

pub use cli::Cli;
pub use config::{ClientConfig, PipelineConfig};
pub use error::{ClientError, ClientResult};
pub use pipeline::Pipeline;
