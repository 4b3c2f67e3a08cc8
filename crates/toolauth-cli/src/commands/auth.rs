//! Authorization command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use toolauth_credentials::{
    ClientSecret, ClientSecretSource, ConsentPolicy, CredentialManager, CredentialState,
    CredentialStatus,
};

use crate::cli::AuthArgs;
use crate::config::{AuthSettings, ClientConfig};
use crate::error::{CliError, CliResult};

/// Runs the interactive authorization for one service.
///
/// Client identity comes from CLI flags, `--credentials-file`, or
/// `config.toml`. Identities given on the command line are written back to
/// `config_path` so later `toolauth token` calls can refresh.
pub async fn run(args: AuthArgs, config: &ClientConfig, config_path: &Path) -> CliResult<()> {
    let profile = config.profile(args.service).map_err(CliError::Config)?;
    let (source, origin) = resolve_client_secret(
        args.client_id,
        args.client_secret,
        args.credentials_file,
        &config.auth,
    )?;

    let mut options = config.auth.issuer_options();
    if let Some(secs) = args.timeout {
        options = options.with_consent_timeout(match secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        });
    }
    if args.no_browser {
        options = options.with_open_browser(false);
    }

    let request = profile
        .request(source.clone(), ConsentPolicy::Interactive)
        .with_reauthorize(args.force);

    if !args.force
        && let CredentialStatus::Stored {
            state: CredentialState::Valid,
            ..
        } = request.status()
    {
        save_client_secret(config_path, &source, origin);
        println!("Already authenticated with {}.", args.service);
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    if args.force || !request.status().is_usable() {
        println!("Starting {} authorization...", args.service);
        println!();
        println!("A browser window will open for you to authorize access.");
        println!("If the browser doesn't open, copy the URL printed below.");
        println!();
    }

    let manager = CredentialManager::with_options(options)?;
    manager.obtain(&request).await?;

    save_client_secret(config_path, &source, origin);

    info!("{} authorization successful", args.service);
    println!("Authorization successful!");
    println!("Credential saved to {}", request.store.path().display());
    Ok(())
}

/// Where the client identity was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretOrigin {
    /// From command-line flags or environment.
    Cli,
    /// From `config.toml` or the default file.
    Config,
}

/// Resolves the client identity.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file`
/// 3. `config.toml` `[auth]` inline values, then `client_secret_path`, then
///    the default `credentials.json`
fn resolve_client_secret(
    cli_client_id: Option<String>,
    cli_client_secret: Option<String>,
    cli_credentials_file: Option<PathBuf>,
    settings: &AuthSettings,
) -> CliResult<(ClientSecretSource, SecretOrigin)> {
    match (cli_client_id, cli_client_secret) {
        (Some(id), Some(secret)) => {
            let secret = ClientSecret::new(id, secret);
            return Ok((ClientSecretSource::Inline(secret), SecretOrigin::Cli));
        }
        (None, None) => {}
        _ => {
            return Err(CliError::Config(
                "both --client-id and --client-secret are required when providing credentials \
                 directly"
                    .to_string(),
            ));
        }
    }

    if let Some(path) = cli_credentials_file {
        return Ok((ClientSecretSource::File(path), SecretOrigin::Cli));
    }

    let source = settings.client_secret_source().map_err(CliError::Config)?;
    Ok((source, SecretOrigin::Config))
}

/// Writes a command-line client identity into `[auth]` of the config file.
///
/// Failures are logged and otherwise ignored: the credential is already
/// stored and the operator can edit the file by hand.
fn save_client_secret(config_path: &Path, source: &ClientSecretSource, origin: SecretOrigin) {
    if origin == SecretOrigin::Config {
        return;
    }
    match update_auth_section(config_path, source) {
        Ok(true) => println!("Client settings saved to {}", config_path.display()),
        Ok(false) => {}
        Err(e) => info!("could not save client settings: {}", e),
    }
}

/// Edits the `[auth]` table in place, keeping the rest of the file intact.
///
/// Returns false when there was nothing to record.
fn update_auth_section(config_path: &Path, source: &ClientSecretSource) -> Result<bool, String> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)
            .map_err(|e| format!("failed to read {}: {}", config_path.display(), e))?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| format!("could not parse {}: {}", config_path.display(), e))?;

    if !doc.contains_key("auth") {
        doc["auth"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let Some(auth) = doc["auth"].as_table_mut() else {
        return Err("[auth] in config.toml is not a table".to_string());
    };

    match source {
        ClientSecretSource::Inline(secret) => {
            auth["client_id"] = toml_edit::value(secret.client_id.as_str());
            auth["client_secret"] = toml_edit::value(secret.client_secret.as_str());
            auth.remove("client_secret_path");
        }
        ClientSecretSource::File(path) => {
            let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            auth["client_secret_path"] = toml_edit::value(path.display().to_string());
            auth.remove("client_id");
            auth.remove("client_secret");
        }
        ClientSecretSource::Missing => return Ok(false),
    }

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("could not create {}: {}", parent.display(), e))?;
    }
    std::fs::write(config_path, doc.to_string())
        .map_err(|e| format!("could not write {}: {}", config_path.display(), e))?;
    Ok(true)
}
