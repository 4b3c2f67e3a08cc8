//! Catalog of the Google-backed services the tool adapters talk to.
//!
//! Each service pins a scope set and a default credential file, so two
//! services never share a token issued for a different scope set.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::client_secret::ClientSecretSource;
use crate::manager::{ConsentPolicy, ObtainRequest};
use crate::store::CredentialStore;

/// A known service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Google Calendar.
    Calendar,
    /// Google Sheets.
    Sheets,
    /// Gmail.
    Gmail,
    /// YouTube Data and Analytics.
    Youtube,
}

impl Service {
    /// All known services, in display order.
    pub const ALL: [Service; 4] = [
        Service::Calendar,
        Service::Sheets,
        Service::Gmail,
        Service::Youtube,
    ];

    /// Returns the service identifier used in config keys and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Sheets => "sheets",
            Self::Gmail => "gmail",
            Self::Youtube => "youtube",
        }
    }

    /// Returns the scopes the service's adapter needs.
    pub fn default_scopes(&self) -> &'static [&'static str] {
        match self {
            Self::Calendar => &["https://www.googleapis.com/auth/calendar"],
            Self::Sheets => &["https://www.googleapis.com/auth/spreadsheets"],
            Self::Gmail => &["https://mail.google.com/"],
            Self::Youtube => &[
                "https://www.googleapis.com/auth/youtube.readonly",
                "https://www.googleapis.com/auth/youtube.force-ssl",
            ],
        }
    }

    /// Returns the default credential file, e.g.
    /// `~/.local/share/toolauth/calendar-token.json`.
    pub fn default_token_path(&self) -> PathBuf {
        toolauth_core::data_dir().join(format!("{}-token.json", self.as_str()))
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "calendar" => Ok(Self::Calendar),
            "sheets" | "spreadsheets" => Ok(Self::Sheets),
            "gmail" | "email" | "mail" => Ok(Self::Gmail),
            "youtube" | "social" => Ok(Self::Youtube),
            other => Err(format!(
                "unknown service '{}' (expected one of: calendar, sheets, gmail, youtube)",
                other
            )),
        }
    }
}

/// A service bound to concrete scopes and a credential file.
#[derive(Debug, Clone)]
pub struct ServiceProfile {
    /// The service.
    pub service: Service,
    /// Scopes to request.
    pub scopes: Vec<String>,
    /// Credential file location.
    pub token_path: PathBuf,
}

impl ServiceProfile {
    /// Creates a profile with the service's default scopes and path.
    pub fn new(service: Service) -> Self {
        Self {
            service,
            scopes: service
                .default_scopes()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            token_path: service.default_token_path(),
        }
    }

    /// Overrides the scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Overrides the credential file location.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Returns the store backing this profile.
    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(&self.token_path)
    }

    /// Builds an obtain request for this profile.
    pub fn request(
        &self,
        client_secret: ClientSecretSource,
        policy: ConsentPolicy,
    ) -> ObtainRequest {
        ObtainRequest::new(self.service.as_str(), self.scopes.clone(), self.store())
            .with_client_secret(client_secret)
            .with_consent_policy(policy)
    }
}
