//! toolauth CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use toolauth_cli::cli::{Cli, Command, ConfigAction};
use toolauth_cli::commands;
use toolauth_cli::config::ClientConfig;
use toolauth_cli::error::{CliError, CliResult};
use toolauth_core::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let (config, config_path) = load_config(cli.config.as_ref())?;

    let tracing_config = if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Command::Auth(args) => commands::auth::run(args, &config, &config_path).await,
        Command::Status { service } => commands::status::run(service, &config),
        Command::Token { service } => commands::token::run(service, &config).await,
        Command::Logout { service } => commands::logout::run(service, &config),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}

/// Loads `--config` if given (it must exist), else the default file if present.
fn load_config(path: Option<&PathBuf>) -> CliResult<(ClientConfig, PathBuf)> {
    match path {
        Some(path) => {
            let config = ClientConfig::load_from(path).map_err(CliError::Config)?;
            Ok((config, path.clone()))
        }
        None => {
            let config = ClientConfig::load().map_err(CliError::Config)?;
            Ok((config, ClientConfig::default_path()))
        }
    }
}
