//! Status command.

use chrono::{DateTime, Local, Utc};
use toolauth_credentials::{ClientSecretSource, ConsentPolicy, CredentialStatus, Service};

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Prints the stored credential state for one or all services.
///
/// Reads the credential files only; nothing is refreshed.
pub fn run(service: Option<Service>, config: &ClientConfig) -> CliResult<()> {
    let services = match service {
        Some(service) => vec![service],
        None => Service::ALL.to_vec(),
    };

    for service in services {
        let profile = config.profile(service).map_err(CliError::Config)?;
        let status = profile
            .request(ClientSecretSource::Missing, ConsentPolicy::Deny)
            .status();
        println!("{:<10} {}", service.as_str(), describe(&status, Utc::now()));
        println!("{:<10} {}", "", profile.token_path.display());
    }
    Ok(())
}

/// Renders a status line.
fn describe(status: &CredentialStatus, now: DateTime<Utc>) -> String {
    match status {
        CredentialStatus::Stored {
            expiry: Some(expiry),
            ..
        } if *expiry > now => format!(
            "{} (expires {}, in {} min)",
            status.label(),
            expiry.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            (*expiry - now).num_minutes()
        ),
        CredentialStatus::Stored {
            expiry: Some(expiry),
            ..
        } => format!(
            "{} (expired {})",
            status.label(),
            expiry.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        CredentialStatus::Unreadable(reason) => format!("{}: {}", status.label(), reason),
        CredentialStatus::ScopeMismatch { missing } => {
            format!("{} (missing {})", status.label(), missing.join(", "))
        }
        _ => status.label().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use toolauth_credentials::CredentialState;

    #[test]
    fn describes_each_state() {
        let now = Utc::now();

        let valid = CredentialStatus::Stored {
            state: CredentialState::Valid,
            expiry: Some(now + Duration::minutes(30)),
        };
        let text = describe(&valid, now);
        assert!(text.starts_with("valid"));
        assert!(text.contains("in 30 min"));

        let expired = CredentialStatus::Stored {
            state: CredentialState::Refreshable,
            expiry: Some(now - Duration::minutes(5)),
        };
        assert!(describe(&expired, now).starts_with("refreshable (expired"));

        let mismatch = CredentialStatus::ScopeMismatch {
            missing: vec!["https://mail.google.com/".to_string()],
        };
        assert_eq!(
            describe(&mismatch, now),
            "scope mismatch (missing https://mail.google.com/)"
        );

        assert_eq!(
            describe(&CredentialStatus::NotAuthenticated, now),
            "not authenticated"
        );
    }

    #[test]
    fn reports_configured_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.services.insert(
            "gmail".to_string(),
            crate::config::ServiceSettings {
                token_path: Some(dir.path().join("gmail.json")),
                scopes: None,
            },
        );

        assert!(run(Some(Service::Gmail), &config).is_ok());
    }
}
