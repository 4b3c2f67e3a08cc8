//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod logout;
pub mod status;
pub mod token;
