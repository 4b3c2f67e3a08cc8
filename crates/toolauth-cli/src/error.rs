//! CLI error types.

use std::fmt;

use toolauth_credentials::CredentialError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Credential lifecycle error.
    Credential(CredentialError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Credential(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Credential(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<CredentialError> for CliError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err)
    }
}
