//! inkcal CLI entry point.

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use inkcal_core::{TracingConfig, init_tracing};

use inkcal_client::cli::{Cli, Command, ConfigAction};
use inkcal_client::commands;
use inkcal_client::config::{ClientConfig, PipelineConfig};
use inkcal_client::error::ClientResult;
use inkcal_client::pipeline::{Pipeline, open_radio, provider_for};
use inkcal_client::signals::SignalHandler;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::new(cli.debug, cli.log_format.into())) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)?
    } else {
        ClientConfig::load()?
    };

    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config, &cli),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Some(Command::Scan) => {
            let pipeline_config = PipelineConfig::resolve(&cli, &config)?;
            let radio = open_radio().await?;
            commands::scan::scan(radio.as_ref(), &pipeline_config.discovery).await
        }
        None => send(&cli, &config).await,
    }
}

/// Fetch, condense and, unless `--no-send`, transmit.
async fn send(cli: &Cli, config: &ClientConfig) -> ClientResult<()> {
    let pipeline_config = PipelineConfig::resolve(cli, config)?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    let provider = provider_for(&pipeline_config.source, config.graph.as_ref())?;
    let pipeline = Pipeline::new(&pipeline_config, signals.subscribe());

    let frame = pipeline.prepare(provider.as_deref(), Utc::now()).await?;
    if !pipeline.sends() {
        return Ok(());
    }

    let radio = open_radio().await?;
    pipeline
        .deliver(radio.as_ref(), frame.as_ref(), Utc::now().timestamp())
        .await
}
