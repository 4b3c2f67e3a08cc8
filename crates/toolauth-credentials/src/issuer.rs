//! The seam between the credential manager and the token issuer.
//!
//! [`TokenIssuer`] is implemented over HTTP by
//! [`OAuthIssuer`](crate::oauth::OAuthIssuer); tests substitute an in-memory
//! issuer to count calls.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::client_secret::ClientSecret;
use crate::error::CredentialResult;

/// A boxed future, used to keep [`TokenIssuer`] object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A successful response from the issuer's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// A refresh token, present after consent and when the issuer rotates it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scopes actually granted.
    #[serde(default)]
    pub scope: Option<String>,
    /// Token type, normally `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// Creates a grant from its core fields.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
            scope: None,
            token_type: None,
        }
    }

    /// Returns the granted scopes if the issuer reported them.
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split_whitespace().map(String::from).collect())
    }
}

/// An OAuth 2.0 token issuer.
///
/// Implementations perform exactly one exchange per call and never retry.
pub trait TokenIssuer: Send + Sync {
    /// Trades a refresh token for a new access token.
    fn refresh<'a>(
        &'a self,
        secret: &'a ClientSecret,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, CredentialResult<TokenGrant>>;

    /// Runs the interactive consent flow for the given scopes.
    ///
    /// Blocks until the user completes authorization in a browser or the
    /// flow fails.
    fn consent<'a>(
        &'a self,
        secret: &'a ClientSecret,
        scopes: &'a [String],
    ) -> BoxFuture<'a, CredentialResult<TokenGrant>>;
}
