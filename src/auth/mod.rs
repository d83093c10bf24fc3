//! Bearer credentials for the export APIs.
//!
//! The OAuth2 authorization flow itself happens out of band; this module only
//! stores and hands out the resulting access token.

mod cache;

pub use cache::{CachedToken, TokenCache};

use crate::config::ACCESS_TOKEN_ENV;
use crate::error_handling::AuthError;

/// Supplies a bearer token for a named application.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self, app: &str) -> Result<String, AuthError>;
}

/// Reads `RESEARCH_EXPORTS_ACCESS_TOKEN` first, then the application's token cache.
#[derive(Debug, Default)]
pub struct CachedTokenProvider {
    cache: Option<TokenCache>,
}

impl CachedTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed cache file instead of the per-application default.
    pub fn with_cache(cache: TokenCache) -> Self {
        Self { cache: Some(cache) }
    }
}

impl CredentialProvider for CachedTokenProvider {
    fn access_token(&self, app: &str) -> Result<String, AuthError> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                log::debug!("Using access token from {ACCESS_TOKEN_ENV}");
                return Ok(token.trim().to_string());
            }
        }

        let cache = self
            .cache
            .clone()
            .unwrap_or_else(|| TokenCache::for_app(app));
        match cache.load()? {
            Some(cached) if !cached.access_token.is_empty() => Ok(cached.access_token),
            _ => Err(AuthError::MissingCredentials {
                app: app.to_string(),
            }),
        }
    }
}

/// A provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub String);

impl CredentialProvider for StaticTokenProvider {
    fn access_token(&self, _app: &str) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Shortens a secret for display: the first 10 characters followed by `...`.
pub fn truncate_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(10).collect();
    if prefix.len() < secret.len() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_credentials() {
        if std::env::var(ACCESS_TOKEN_ENV).is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let provider = CachedTokenProvider::with_cache(TokenCache::at(dir.path().join("c.json")));
        let err = provider.access_token("app").unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials { .. }));
    }

    #[test]
    fn test_cached_token_returned() {
        if std::env::var(ACCESS_TOKEN_ENV).is_ok() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::at(dir.path().join("c.json"));
        cache.store("abc").unwrap();
        let provider = CachedTokenProvider::with_cache(cache);
        assert_eq!(provider.access_token("app").unwrap(), "abc");
    }

    #[test]
    fn test_truncate_secret() {
        assert_eq!(truncate_secret("0123456789abcdef"), "0123456789...");
        assert_eq!(truncate_secret("short"), "short");
    }
}
