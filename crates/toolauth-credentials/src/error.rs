//! Error types for credential operations.
//!
//! Every failure in this crate is a [`CredentialError`] tagged with a
//! [`CredentialErrorCode`], so callers can tell a fatal configuration problem
//! from a recoverable one without inspecting message strings.

use std::fmt;
use thiserror::Error;

/// The category of a credential error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialErrorCode {
    /// No client secret is available but interactive consent is required.
    MissingClientSecret,
    /// The credential store is absent or cannot be parsed.
    MissingOrUnreadableStore,
    /// The refresh exchange was rejected or the issuer was unreachable.
    RefreshFailed,
    /// Interactive consent did not complete (denied, timed out, bind failure).
    ConsentFailed,
    /// Consent is needed but the caller does not allow an interactive flow.
    ConsentRequired,
    /// A vendor API rejected the bearer token (401/403).
    AuthenticationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl CredentialErrorCode {
    /// Returns true if this error must abort the current invocation.
    ///
    /// Only an unreadable store is recoverable: the manager treats it as "no
    /// cached credential" and falls through to refresh or consent.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingOrUnreadableStore)
    }

    /// Returns true if the operator has to re-run interactive consent.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::RefreshFailed | Self::ConsentRequired | Self::AuthenticationFailed
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingClientSecret => "missing_client_secret",
            Self::MissingOrUnreadableStore => "missing_or_unreadable_store",
            Self::RefreshFailed => "refresh_failed",
            Self::ConsentFailed => "consent_failed",
            Self::ConsentRequired => "consent_required",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for CredentialErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while obtaining or using a credential.
#[derive(Debug, Error)]
pub struct CredentialError {
    /// The error code categorizing this error.
    code: CredentialErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The service the credential belongs to (e.g., "calendar").
    service: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CredentialError {
    /// Creates a new credential error with the given code and message.
    pub fn new(code: CredentialErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            service: None,
            source: None,
        }
    }

    /// Creates a missing client secret error.
    pub fn missing_client_secret(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::MissingClientSecret, message)
    }

    /// Creates an unreadable store error.
    pub fn unreadable_store(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::MissingOrUnreadableStore, message)
    }

    /// Creates a refresh failure.
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::RefreshFailed, message)
    }

    /// Creates a consent failure.
    pub fn consent_failed(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::ConsentFailed, message)
    }

    /// Creates a consent-required error.
    pub fn consent_required(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::ConsentRequired, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CredentialErrorCode::InternalError, message)
    }

    /// Sets the service name for this error.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> CredentialErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the service name, if set.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Returns true if this error must abort the current invocation.
    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    /// Returns true if the operator has to re-run interactive consent.
    pub fn needs_reauth(&self) -> bool {
        self.code.needs_reauth()
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref service) = self.service {
            write!(f, "[{}] ", service)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;
