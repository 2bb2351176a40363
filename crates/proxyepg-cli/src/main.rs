//! proxyepg CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};

use proxyepg_cli::cli::{Cli, Command, ConfigAction};
use proxyepg_cli::commands;
use proxyepg_cli::config::AppConfig;
use proxyepg_cli::error::{CliError, CliResult};
use proxyepg_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Some(format) = cli.log_format {
        tracing = tracing.with_format(format);
    }
    if let Err(e) = init_tracing(tracing) {
        eprintln!("error: {}", CliError::from(e));
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = if cli.config.is_some() {
        AppConfig::load_from(&config_path).map_err(CliError::Config)?
    } else {
        AppConfig::load().map_err(CliError::Config)?
    };
    cli.apply_overrides(&mut config)?;
    debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Some(Command::Channels) => commands::channels::list(&config),
        Some(Command::Run) | None => {
            let report = commands::run::run(&config).await?;
            info!(%report, "done");
            Ok(())
        }
    }
}
