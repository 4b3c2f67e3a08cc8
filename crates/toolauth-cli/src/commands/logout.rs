//! Logout command.

use toolauth_credentials::Service;

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};

/// Deletes the stored credential for the service.
///
/// The grant itself is not revoked with the issuer.
pub fn run(service: Service, config: &ClientConfig) -> CliResult<()> {
    let store = config.profile(service).map_err(CliError::Config)?.store();
    if store.clear()? {
        println!("Removed {} credential at {}", service, store.path().display());
    } else {
        println!("No {} credential stored at {}", service, store.path().display());
    }
    Ok(())
}
