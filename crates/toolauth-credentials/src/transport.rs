//! Authenticated HTTP transport handed to service adapters.
//!
//! Adapters build requests through an [`AuthenticatedTransport`] and never
//! see the refresh token or the client secret.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::credential::Credential;
use crate::error::{CredentialError, CredentialResult};

/// Settings for [`BearerTransport`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("toolauth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportOptions {
    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An HTTP client that attaches a credential to outgoing requests.
pub trait AuthenticatedTransport: Send + Sync {
    /// The credential requests are authorized with.
    fn credential(&self) -> &Credential;

    /// The underlying HTTP client.
    fn http_client(&self) -> &reqwest::Client;

    /// Adds the authorization header to a request.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.credential().access_token)
    }

    /// Starts an authorized GET request.
    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http_client().get(url))
    }

    /// Starts an authorized POST request.
    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http_client().post(url))
    }
}

/// Bearer token transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct BearerTransport {
    credential: Credential,
    http_client: reqwest::Client,
}

impl BearerTransport {
    /// Creates a transport for the given credential.
    pub fn new(credential: Credential, options: TransportOptions) -> CredentialResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(|e| {
                CredentialError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            credential,
            http_client,
        })
    }

    /// Sends a request and decodes a JSON response.
    ///
    /// A 401 or 403 means the credential was rejected and maps to
    /// `AuthenticationFailed`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> CredentialResult<T> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CredentialError::network("request timeout")
            } else if e.is_connect() {
                CredentialError::network(format!("connection failed: {}", e))
            } else {
                CredentialError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        debug!("service responded with {}", status);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CredentialError::authentication(format!(
                "credential rejected ({}); re-run `toolauth auth` for this service",
                status
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::network(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            CredentialError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

impl AuthenticatedTransport for BearerTransport {
    fn credential(&self) -> &Credential {
        &self.credential
    }

    fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}
