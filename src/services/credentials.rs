use crate::models::Credentials;
use crate::services::persist::write_atomically;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when accessing the credential file
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error on credential file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Credential file {} is unreadable: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No phone number configured in {}", .0.display())]
    MissingPhoneNumber(PathBuf),
}

/// JSON file holding the phone number and the token triple
///
/// Nothing is cached: every read goes to disk so edits made while the bot
/// runs are picked up, and every write replaces the whole file atomically.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current credentials; a missing file means no credentials yet
    pub fn load(&self) -> Result<Credentials, CredentialError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No credential file at {}", self.path.display());
                return Ok(Credentials::default());
            }
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|source| CredentialError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(credentials).map_err(|source| CredentialError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        write_atomically(&self.path, json.as_bytes()).map_err(|source| CredentialError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Read, modify and write back the credentials
    pub fn update<F>(&self, change: F) -> Result<Credentials, CredentialError>
    where
        F: FnOnce(&mut Credentials),
    {
        let mut credentials = self.load()?;
        change(&mut credentials);
        self.save(&credentials)?;
        Ok(credentials)
    }

    pub fn phone_number(&self) -> Result<String, CredentialError> {
        self.load()?
            .phone_number
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| CredentialError::MissingPhoneNumber(self.path.clone()))
    }
}
