//! The application's registered OAuth client identity.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{CredentialError, CredentialResult};

/// Google's authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 client identity plus the issuer endpoints it talks to.
///
/// Supplied by the operator out of band and never written by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecret {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
    /// Authorization endpoint (interactive, browser redirect).
    pub auth_uri: String,
    /// Token endpoint (code exchange and refresh).
    pub token_uri: String,
}

/// Structure of Google's OAuth client JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<NestedClientSecret>,
    web: Option<NestedClientSecret>,
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Client identity within a nested section of the JSON file.
#[derive(Debug, Deserialize)]
struct NestedClientSecret {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

impl ClientSecret {
    /// Creates a client identity using Google's endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: GOOGLE_AUTH_URL.to_string(),
            token_uri: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Sets the authorization endpoint.
    pub fn with_auth_uri(mut self, auth_uri: impl Into<String>) -> Self {
        self.auth_uri = auth_uri.into();
        self
    }

    /// Sets the token endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Loads the client identity from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> CredentialResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CredentialError::missing_client_secret(format!(
                "failed to read client secret file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a Google client JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> CredentialResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            CredentialError::missing_client_secret(format!(
                "failed to parse client secret JSON: {}",
                e
            ))
        })?;

        let (client_id, client_secret, auth_uri, token_uri) =
            if let Some(nested) = file.installed.or(file.web) {
                (
                    nested.client_id,
                    nested.client_secret,
                    nested.auth_uri,
                    nested.token_uri,
                )
            } else if let (Some(id), Some(secret)) = (file.client_id, file.client_secret) {
                (id, secret, file.auth_uri, file.token_uri)
            } else {
                return Err(CredentialError::missing_client_secret(
                    "client secret file must contain an 'installed'/'web' section or \
                     'client_id'/'client_secret' at root level",
                ));
            };

        let mut secret = Self::new(client_id, client_secret);
        if let Some(auth_uri) = auth_uri {
            secret.auth_uri = auth_uri;
        }
        if let Some(token_uri) = token_uri {
            secret.token_uri = token_uri;
        }
        Ok(secret)
    }

    /// Validates that the identity is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.is_empty() {
            return Err("client_id is required".to_string());
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required".to_string());
        }
        for (name, value) in [("auth_uri", &self.auth_uri), ("token_uri", &self.token_uri)] {
            url::Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
        }
        Ok(())
    }
}

/// Where the client identity comes from.
///
/// A file source is only read when the manager actually needs the identity,
/// so adapters holding a valid credential never touch it.
#[derive(Debug, Clone, Default)]
pub enum ClientSecretSource {
    /// No client identity was configured.
    #[default]
    Missing,
    /// An identity resolved by the caller.
    Inline(ClientSecret),
    /// A Google Cloud Console JSON file.
    File(PathBuf),
}

impl ClientSecretSource {
    /// Resolves the client identity.
    ///
    /// Every failure carries the `MissingClientSecret` code.
    pub fn resolve(&self) -> CredentialResult<ClientSecret> {
        let secret = match self {
            Self::Missing => {
                return Err(CredentialError::missing_client_secret(
                    "no OAuth client secret configured; download the OAuth 2.0 client JSON \
                     from Google Cloud Console and pass it with --credentials-file",
                ));
            }
            Self::Inline(secret) => secret.clone(),
            Self::File(path) => {
                if !path.exists() {
                    return Err(CredentialError::missing_client_secret(format!(
                        "{} not found; download the OAuth 2.0 client JSON from Google Cloud \
                         Console and save it there",
                        path.display()
                    )));
                }
                debug!("reading client secret from {:?}", path);
                ClientSecret::from_file(path)?
            }
        };

        secret.validate().map_err(|e| {
            CredentialError::missing_client_secret(format!("invalid client secret: {}", e))
        })?;
        Ok(secret)
    }

    /// Returns true if no source was configured at all.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}
