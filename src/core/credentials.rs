//! API key storage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::core::errors::{ExportError, Result};

/// Onshape API key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// API access key
    pub access_key: String,
    /// API secret key
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Credentials from a key pair
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ExportError::CredentialError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| ExportError::CredentialError {
            message: format!("malformed {}: {}", path.display(), e),
        })
    }

    /// Save to JSON file, creating parent directories as needed
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ExportError::FileError {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }

        let content = serde_json::to_string(self)?;
        std::fs::write(path, content).map_err(|e| ExportError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Ask for both keys on the terminal; the secret is not echoed
    pub fn prompt() -> Result<Self> {
        let access_key: String = dialoguer::Input::new()
            .with_prompt("Enter Onshape Access Key")
            .interact_text()
            .map_err(|e| ExportError::CredentialError {
                message: format!("Input error: {}", e),
            })?;

        let secret_key = dialoguer::Password::new()
            .with_prompt("Enter Onshape Secret Key")
            .interact()
            .map_err(|e| ExportError::CredentialError {
                message: format!("Input error: {}", e),
            })?;

        Ok(Self::new(access_key.trim(), secret_key.trim()))
    }

    /// Load the stored keys, or prompt for them and store them at `path`
    pub fn load_or_prompt<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_or_else(path, Self::prompt)
    }

    /// Load the stored keys, or obtain them from `ask` and store them at `path`
    pub fn load_or_else<P, F>(path: P, ask: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce() -> Result<Self>,
    {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading credentials from {}", path.display());
            return Self::from_file(path);
        }

        let credentials = ask()?;
        credentials.to_file(path)?;
        info!("Saved credentials to {}", path.display());
        Ok(credentials)
    }
}
