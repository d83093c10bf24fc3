//! HTTP client initialization.
//!
//! Two clients are used: one for the JSON APIs with a short per-request
//! timeout, and one for archive downloads that may take a long time.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{ApiOptions, DOWNLOAD_TIMEOUT_SECS};

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Initializes the HTTP client used for export, lookup and clickstream API calls.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_client(api: &ApiOptions) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .timeout(api.api_timeout())
        .user_agent(user_agent())
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the HTTP client used to stream export archives.
///
/// Only connecting is bounded by the API timeout; the transfer itself may run
/// for up to an hour.
pub fn init_download_client(api: &ApiOptions) -> Result<Arc<reqwest::Client>, reqwest::Error> {
    let client = ClientBuilder::new()
        .connect_timeout(api.api_timeout())
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .user_agent(user_agent())
        .build()?;
    Ok(Arc::new(client))
}
