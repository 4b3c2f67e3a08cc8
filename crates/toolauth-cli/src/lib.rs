//! Operator CLI for toolauth.
//!
//! Provides the `toolauth` binary: the out-of-band `auth` step that runs the
//! browser consent flow, plus `status`, `token`, `logout` and `config`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use cli::Cli;
pub use error::{CliError, CliResult};
