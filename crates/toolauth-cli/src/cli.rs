//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use toolauth_credentials::Service;

/// toolauth - OAuth credentials for tool adapters
#[derive(Debug, Parser)]
#[command(name = "toolauth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "TOOLAUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize a service in the browser and store its credential
    Auth(AuthArgs),

    /// Show stored credentials without contacting the issuer
    Status {
        /// Only show this service
        service: Option<Service>,
    },

    /// Print a valid access token, refreshing it if needed
    Token {
        /// Service to print the token for
        service: Service,
    },

    /// Delete a stored credential
    Logout {
        /// Service to log out of
        service: Service,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `toolauth auth`.
#[derive(Debug, Args)]
pub struct AuthArgs {
    /// Service to authorize (calendar, sheets, gmail, youtube)
    pub service: Service,

    /// Path to the Google Cloud Console OAuth client JSON file
    #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// OAuth client ID
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Discard the stored credential and authorize again
    #[arg(long, short)]
    pub force: bool,

    /// Seconds to wait for the browser authorization (0 waits forever)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
