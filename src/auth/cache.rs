//! On-disk bearer token cache.
//!
//! One JSON file per OAuth2 application under `~/.coursera/`, written with
//! owner-only permissions on unix.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LOCAL_AUTH_FOLDER;
use crate::error_handling::AuthError;

/// A stored access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub stored_at: DateTime<Utc>,
}

/// Token cache file for one application.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// `~/.coursera/<app>_oauth2_cache.json`
    pub fn for_app(app: &str) -> Self {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join(LOCAL_AUTH_FOLDER).join(format!("{app}_oauth2_cache.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached token. A missing file is not an error.
    pub fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| AuthError::CorruptCache {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Replaces the cached token.
    pub fn store(&self, access_token: &str) -> Result<CachedToken, AuthError> {
        let token = CachedToken {
            access_token: access_token.trim().to_string(),
            stored_at: Utc::now(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string_pretty(&token).map_err(|source| {
            AuthError::CorruptCache {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        fs::write(&self.path, body).map_err(|e| self.io_error(e))?;
        restrict_permissions(&self.path).map_err(|e| self.io_error(e))?;
        log::debug!("Stored access token in {}", self.path.display());
        Ok(token)
    }

    fn io_error(&self, source: std::io::Error) -> AuthError {
        AuthError::Cache {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
