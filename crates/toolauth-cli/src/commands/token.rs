//! Token command.
//!
//! The non-interactive path adapters and scripts use: a valid token is
//! printed as-is, an expired one is refreshed first, and anything needing
//! the browser fails with an instruction to run `toolauth auth`.

use toolauth_credentials::{ConsentPolicy, CredentialManager, Service};

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Prints a valid access token for the service to stdout.
pub async fn run(service: Service, config: &ClientConfig) -> CliResult<()> {
    let profile = config.profile(service).map_err(CliError::Config)?;
    let source = config
        .auth
        .client_secret_source()
        .map_err(CliError::Config)?;
    let request = profile.request(source, ConsentPolicy::Deny);

    let manager = CredentialManager::with_options(config.auth.issuer_options())?;
    let credential = manager.obtain(&request).await?;

    println!("{}", credential.access_token);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceSettings;
    use toolauth_credentials::CredentialErrorCode;

    fn config_with_token_path(path: std::path::PathBuf) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.services.insert(
            "youtube".to_string(),
            ServiceSettings {
                token_path: Some(path),
                scopes: None,
            },
        );
        config
    }

    #[tokio::test]
    async fn never_starts_consent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_token_path(dir.path().join("youtube.json"));
        config.auth.client_id = Some("id.apps.googleusercontent.com".to_string());
        config.auth.client_secret = Some("secret".to_string());

        match run(Service::Youtube, &config).await {
            Err(CliError::Credential(e)) => {
                assert_eq!(e.code(), CredentialErrorCode::ConsentRequired);
                assert!(e.message().contains("toolauth auth youtube"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_client_secret_is_reported_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_token_path(dir.path().join("youtube.json"));
        config.auth.client_secret_path = Some(dir.path().join("credentials.json"));

        match run(Service::Youtube, &config).await {
            Err(CliError::Credential(e)) => {
                assert_eq!(e.code(), CredentialErrorCode::MissingClientSecret);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!dir.path().join("youtube.json").exists());
    }
}
