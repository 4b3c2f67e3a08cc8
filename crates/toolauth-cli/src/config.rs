//! CLI configuration.
//!
//! All settings live in `~/.config/toolauth/config.toml` by default:
//!
//! ```toml
//! [auth]
//! client_secret_path = "/home/me/.config/toolauth/credentials.json"
//! consent_timeout_secs = 120
//!
//! [services.gmail]
//! token_path = "/srv/adapters/gmail-token.json"
//! ```
//!
//! `client_id` and `client_secret` may be given inline instead of a file and
//! support `pass::` and `env::` references.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use toolauth_credentials::{
    ClientSecret, ClientSecretSource, IssuerOptions, Service, ServiceProfile,
};

/// Name of the default client secret file inside the config directory.
pub const CLIENT_SECRET_FILE: &str = "credentials.json";

/// Configuration for the toolauth CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Issuer and client identity settings.
    pub auth: AuthSettings,

    /// Per-service overrides keyed by service name.
    pub services: BTreeMap<String, ServiceSettings>,
}

/// Settings shared by every service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Path to the Google Cloud Console client JSON file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_path: Option<PathBuf>,

    /// Seconds to wait for browser authorization; 0 waits forever.
    pub consent_timeout_secs: u64,

    /// First loopback port to try; 0 with `loopback_port_end = 0` picks any.
    pub loopback_port_start: u16,

    /// Last loopback port to try.
    pub loopback_port_end: u16,

    /// Token endpoint timeout in seconds.
    pub http_timeout_secs: u64,

    /// Whether to launch the browser during authorization.
    pub open_browser: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            client_secret_path: None,
            consent_timeout_secs: IssuerOptions::DEFAULT_CONSENT_TIMEOUT_SECS,
            loopback_port_start: 0,
            loopback_port_end: 0,
            http_timeout_secs: IssuerOptions::DEFAULT_HTTP_TIMEOUT_SECS,
            open_browser: true,
        }
    }
}

/// Overrides for one service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Credential file location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    /// Scopes to request instead of the service defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        toolauth_core::config_dir().join("config.toml")
    }

    /// Builds the profile for a service, applying any overrides.
    pub fn profile(&self, service: Service) -> Result<ServiceProfile, String> {
        let mut profile = ServiceProfile::new(service);
        if let Some(settings) = self.services.get(service.as_str()) {
            if let Some(ref path) = settings.token_path {
                profile = profile.with_token_path(path);
            }
            if let Some(ref scopes) = settings.scopes {
                if scopes.is_empty() {
                    return Err(format!("[services.{}] scopes must not be empty", service));
                }
                profile = profile.with_scopes(scopes.clone());
            }
        }
        Ok(profile)
    }

    /// Checks everything that can be checked without network access.
    pub fn validate(&self) -> Result<(), String> {
        for (name, settings) in &self.services {
            let service: Service = name.parse()?;
            if settings.scopes.as_ref().is_some_and(|s| s.is_empty()) {
                return Err(format!("[services.{}] scopes must not be empty", service));
            }
        }
        self.auth.issuer_options().validate()?;
        if let ClientSecretSource::Inline(secret) = self.auth.client_secret_source()? {
            secret.validate()?;
        }
        Ok(())
    }
}

impl AuthSettings {
    /// Converts to issuer options.
    pub fn issuer_options(&self) -> IssuerOptions {
        let consent_timeout = match self.consent_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        IssuerOptions::default()
            .with_consent_timeout(consent_timeout)
            .with_loopback_port_range(self.loopback_port_start, self.loopback_port_end)
            .with_http_timeout(Duration::from_secs(self.http_timeout_secs))
            .with_open_browser(self.open_browser)
    }

    /// Returns where the client identity comes from.
    ///
    /// Inline `client_id`/`client_secret` win over a file. Without either,
    /// `credentials.json` in the config directory is used.
    pub fn client_secret_source(&self) -> Result<ClientSecretSource, String> {
        match (&self.client_id, &self.client_secret) {
            (Some(raw_id), Some(raw_secret)) => {
                let client_id = crate::secret::resolve(raw_id)
                    .map_err(|e| format!("failed to resolve client_id: {}", e))?;
                let client_secret = crate::secret::resolve(raw_secret)
                    .map_err(|e| format!("failed to resolve client_secret: {}", e))?;
                Ok(ClientSecretSource::Inline(ClientSecret::new(
                    client_id,
                    client_secret,
                )))
            }
            (Some(_), None) => {
                Err("client_secret is missing from [auth] section in config.toml".to_string())
            }
            (None, Some(_)) => {
                Err("client_id is missing from [auth] section in config.toml".to_string())
            }
            (None, None) => Ok(ClientSecretSource::File(
                self.client_secret_path
                    .clone()
                    .unwrap_or_else(default_client_secret_path),
            )),
        }
    }
}

/// Returns the default client secret file path.
pub fn default_client_secret_path() -> PathBuf {
    toolauth_core::config_dir().join(CLIENT_SECRET_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.auth.consent_timeout_secs, 120);
        assert!(config.auth.open_browser);
        assert!(config.services.is_empty());

        let options = config.auth.issuer_options();
        assert_eq!(options.loopback_port_range, (0, 0));
        assert_eq!(options.consent_timeout, Some(Duration::from_secs(120)));

        match config.auth.client_secret_source().unwrap() {
            ClientSecretSource::File(path) => assert!(path.ends_with(CLIENT_SECRET_FILE)),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let config: ClientConfig = toml::from_str("[auth]\nconsent_timeout_secs = 0\n").unwrap();
        assert_eq!(config.auth.issuer_options().consent_timeout, None);
    }

    #[test]
    fn service_overrides_apply() {
        let toml_content = r#"
[services.gmail]
token_path = "/srv/gmail-token.json"
scopes = ["https://www.googleapis.com/auth/gmail.readonly"]
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();

        let gmail = config.profile(Service::Gmail).unwrap();
        assert_eq!(gmail.token_path, PathBuf::from("/srv/gmail-token.json"));
        assert_eq!(
            gmail.scopes,
            vec!["https://www.googleapis.com/auth/gmail.readonly".to_string()]
        );

        let calendar = config.profile(Service::Calendar).unwrap();
        assert_eq!(
            calendar.scopes,
            vec!["https://www.googleapis.com/auth/calendar".to_string()]
        );
    }

    #[test]
    fn inline_credentials_with_env_references() {
        unsafe {
            std::env::set_var("_TOOLAUTH_CFG_ID", "env-id.apps.googleusercontent.com");
            std::env::set_var("_TOOLAUTH_CFG_SECRET", "env-secret");
        }

        let toml_content = r#"
[auth]
client_id = "env::_TOOLAUTH_CFG_ID"
client_secret = "env::_TOOLAUTH_CFG_SECRET"
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        match config.auth.client_secret_source().unwrap() {
            ClientSecretSource::Inline(secret) => {
                assert_eq!(secret.client_id, "env-id.apps.googleusercontent.com");
                assert_eq!(secret.client_secret, "env-secret");
            }
            other => panic!("unexpected source: {:?}", other),
        }

        unsafe {
            std::env::remove_var("_TOOLAUTH_CFG_ID");
            std::env::remove_var("_TOOLAUTH_CFG_SECRET");
        }
    }

    #[test]
    fn partial_inline_credentials_error() {
        let config: ClientConfig = toml::from_str("[auth]\nclient_id = \"id\"\n").unwrap();
        let err = config.auth.client_secret_source().unwrap_err();
        assert!(err.contains("client_secret"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let config: ClientConfig = toml::from_str("[services.dropbox]\n").unwrap();
        assert!(config.validate().unwrap_err().contains("unknown service"));

        let config: ClientConfig = toml::from_str("[services.sheets]\nscopes = []\n").unwrap();
        assert!(config.validate().is_err());
        assert!(config.profile(Service::Sheets).is_err());

        let config: ClientConfig =
            toml::from_str("[auth]\nloopback_port_start = 9000\nloopback_port_end = 8000\n")
                .unwrap();
        assert!(config.validate().is_err());

        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "debug = true\n[auth]\nhttp_timeout_secs = 5\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert!(config.debug);
        assert_eq!(config.auth.http_timeout_secs, 5);

        assert!(ClientConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
