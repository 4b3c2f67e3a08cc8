//! File-backed credential persistence.
//!
//! One JSON file holds one credential. Writes go to a sibling temp file that
//! is renamed over the target, so a reader sees either the old record or the
//! new one. There is no locking: the store assumes a single writer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::{CredentialError, CredentialResult};

/// A single persisted credential record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    /// Path to the credential file.
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the credential file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the stored credential.
    ///
    /// Returns `Ok(None)` when no file exists. A file that cannot be read or
    /// parsed yields a `MissingOrUnreadableStore` error.
    pub fn load(&self) -> CredentialResult<Option<Credential>> {
        if !self.path.exists() {
            debug!("no credential file at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            CredentialError::unreadable_store(format!(
                "failed to read credential file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        let credential: Credential = serde_json::from_str(&content).map_err(|e| {
            CredentialError::unreadable_store(format!(
                "failed to parse credential file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        debug!("loaded credential from {:?}", self.path);
        Ok(Some(credential))
    }

    /// Persists the credential, replacing any previous record.
    pub fn save(&self, credential: &Credential) -> CredentialResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                CredentialError::configuration(format!(
                    "failed to create credential directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(credential).map_err(|e| {
            CredentialError::internal(format!("failed to serialize credential: {}", e))
        })?;

        let temp_path = self.temp_path();
        fs::write(&temp_path, &content).map_err(|e| {
            CredentialError::configuration(format!("failed to write credential file: {}", e))
        })?;

        // The file holds bearer tokens and the client secret
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CredentialError::configuration(format!("failed to replace credential file: {}", e))
        })?;

        info!("saved credential to {:?}", self.path);
        Ok(())
    }

    /// Deletes the stored credential.
    ///
    /// Returns true if a file was removed.
    pub fn clear(&self) -> CredentialResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).map_err(|e| {
            CredentialError::configuration(format!("failed to remove credential file: {}", e))
        })?;
        info!("cleared credential at {:?}", self.path);
        Ok(true)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
