//! The OAuth credential record and its validity rules.

use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::client_secret::ClientSecret;
use crate::error::{CredentialError, CredentialResult};
use crate::issuer::TokenGrant;

/// Margin applied when deciding whether an access token has expired.
///
/// A token that expires within this window is treated as already expired so
/// it is never handed to an adapter moments before the issuer rejects it.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Validity of a credential at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// The access token can be used as-is.
    Valid,
    /// The access token expired but a refresh token is present.
    Refreshable,
    /// The access token expired and there is no refresh token.
    Unusable,
}

impl CredentialState {
    /// Returns a human-readable name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Refreshable => "refreshable",
            Self::Unusable => "unusable",
        }
    }
}

/// A delegated-authority token set.
///
/// The serialized form is a superset of the Google "authorized user" JSON, so
/// `token.json` files written by Google's own client libraries load here
/// unchanged (`token` is accepted for `access_token`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// The bearer token for API requests.
    #[serde(alias = "token")]
    pub access_token: String,

    /// The long-lived token for obtaining new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token expires. `None` means it does not expire.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,

    /// The scopes the token was issued for.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Token endpoint of the issuer that minted this credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,

    /// Client ID the credential was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret the credential was issued to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// When the access token was last issued or refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Credential {
    /// Creates a credential from its core fields.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expiry,
            scopes,
            token_uri: None,
            client_id: None,
            client_secret: None,
            last_refresh: None,
        }
    }

    /// Builds a credential from a token endpoint grant.
    ///
    /// The granted scope list is taken from the grant when the issuer reports
    /// one, otherwise the requested scopes are assumed.
    ///
    /// Fails with `InvalidResponse` when `expires_in` is out of range.
    pub fn from_grant(
        grant: TokenGrant,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> CredentialResult<Self> {
        let scopes = grant
            .granted_scopes()
            .unwrap_or_else(|| requested_scopes.to_vec());
        let expiry = expiry_after(now, grant.expires_in)?;

        Ok(Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expiry,
            scopes,
            token_uri: None,
            client_id: None,
            client_secret: None,
            last_refresh: Some(now),
        })
    }

    /// Records the issuer identity so a later refresh works without the
    /// client secret file.
    pub fn with_issuer(mut self, secret: &ClientSecret) -> Self {
        self.token_uri = Some(secret.token_uri.clone());
        self.client_id = Some(secret.client_id.clone());
        self.client_secret = Some(secret.client_secret.clone());
        self
    }

    /// Returns the issuer identity recorded in this credential, if complete.
    pub fn issuer_identity(&self) -> Option<ClientSecret> {
        let client_id = self.client_id.as_ref()?;
        let client_secret = self.client_secret.as_ref()?;
        let mut secret = ClientSecret::new(client_id, client_secret);
        if let Some(ref token_uri) = self.token_uri {
            secret.token_uri = token_uri.clone();
        }
        Some(secret)
    }

    /// Replaces the access token after a refresh exchange.
    ///
    /// The refresh token is only replaced when the issuer rotated it. On
    /// error the credential is left unchanged.
    pub fn apply_refresh(
        &mut self,
        grant: TokenGrant,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        let expiry = expiry_after(now, grant.expires_in)?;
        self.access_token = grant.access_token;
        self.expiry = expiry;
        if let Some(refresh_token) = grant.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.last_refresh = Some(now);
        Ok(())
    }

    /// Returns true if the access token is expired at `now`, skew included.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }

    /// Returns true if the access token is expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Classifies the credential at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> CredentialState {
        if !self.is_expired_at(now) {
            CredentialState::Valid
        } else if self.refresh_token.is_some() {
            CredentialState::Refreshable
        } else {
            CredentialState::Unusable
        }
    }

    /// Classifies the credential now.
    pub fn state(&self) -> CredentialState {
        self.state_at(Utc::now())
    }

    /// Returns true if every required scope was granted to this credential.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns the time until the token expires, if known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expiry.map(|expiry| expiry - Utc::now())
    }
}

/// Turns an `expires_in` lifetime into an absolute expiry.
fn expiry_after(
    now: DateTime<Utc>,
    expires_in: Option<i64>,
) -> CredentialResult<Option<DateTime<Utc>>> {
    let Some(secs) = expires_in else {
        return Ok(None);
    };
    TimeDelta::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .map(Some)
        .ok_or_else(|| {
            CredentialError::invalid_response(format!("token lifetime out of range: {}s", secs))
        })
}
