//! Configuration commands.

use std::path::Path;

use crate::cli::Cli;
use crate::config::{ClientConfig, EventSource, PipelineConfig};
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration as the next run would see it.
pub fn validate(config: &ClientConfig, cli: &Cli) -> ClientResult<()> {
    let pipeline = PipelineConfig::resolve(cli, config)?;

    #[cfg(feature = "graph")]
    if pipeline.source == EventSource::Graph {
        match &config.graph {
            Some(graph) => {
                graph.to_provider_config()?;
                println!("Graph credentials are valid.");
            }
            None => println!("No [graph] section; runs need --events-file or --skip-fetch."),
        }
    }
    #[cfg(not(feature = "graph"))]
    if pipeline.source == EventSource::Graph {
        println!("Built without Graph support; runs need --events-file or --skip-fetch.");
    }

    println!(
        "Timezone {}, {} day window, output {}",
        pipeline.zone,
        pipeline.days,
        pipeline.output.display()
    );
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
