//! Configuration commands.

use std::path::Path;

use toolauth_credentials::Service;

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Dumps the effective configuration to stdout.
///
/// Plain-text client secrets are masked; `env::` and `pass::` references are
/// shown as written.
pub fn dump(config: &ClientConfig, config_path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(&masked(config))
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", config_path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validates the configuration and the client secret it points to.
pub fn validate(config: &ClientConfig) -> CliResult<()> {
    config.validate().map_err(CliError::Config)?;

    for service in Service::ALL {
        let profile = config.profile(service).map_err(CliError::Config)?;
        println!(
            "{:<10} {} scope(s), token at {}",
            service.as_str(),
            profile.scopes.len(),
            profile.token_path.display()
        );
    }

    let source = config
        .auth
        .client_secret_source()
        .map_err(CliError::Config)?;
    match source.resolve() {
        Ok(secret) => println!("Client secret is valid (client_id {}).", secret.client_id),
        Err(e) => println!("warning: {}", e.message()),
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path(config_path: &Path) -> CliResult<()> {
    println!("config: {}", config_path.display());
    println!(
        "client secret: {}",
        crate::config::default_client_secret_path().display()
    );
    println!("credentials: {}", toolauth_core::data_dir().display());
    Ok(())
}

fn masked(config: &ClientConfig) -> ClientConfig {
    let mut config = config.clone();
    if let Some(ref secret) = config.auth.client_secret
        && !crate::secret::is_reference(secret)
    {
        config.auth.client_secret = Some("********".to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_plain_secret_only() {
        let mut config = ClientConfig::default();
        config.auth.client_secret = Some("hunter2".to_string());
        assert_eq!(
            masked(&config).auth.client_secret.as_deref(),
            Some("********")
        );

        config.auth.client_secret = Some("pass::google/oauth".to_string());
        assert_eq!(
            masked(&config).auth.client_secret.as_deref(),
            Some("pass::google/oauth")
        );
    }

    #[test]
    fn dumped_config_parses_back() {
        let mut config = ClientConfig::default();
        config.auth.consent_timeout_secs = 30;
        let text = toml::to_string_pretty(&masked(&config)).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.auth.consent_timeout_secs, 30);
    }

    #[test]
    fn validate_reports_config_errors() {
        let mut config = ClientConfig::default();
        config.auth.client_id = Some("only-id".to_string());
        assert!(matches!(validate(&config), Err(CliError::Config(_))));
    }
}
