//! Requests against the clickstream download links API.

use super::export_request::{Interval, Scope};
use crate::error_handling::ApiError;

/// Parameters for generating signed clickstream download links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickstreamLinksRequest {
    pub scope: Scope,
    pub interval: Option<Interval>,
}

impl ClickstreamLinksRequest {
    /// Group scopes have no clickstream data and are rejected here.
    pub fn new(scope: Scope, interval: Option<Interval>) -> Result<Self, ApiError> {
        if let Scope::Group { .. } = scope {
            return Err(ApiError::InvalidRequest(
                "clickstream download links are not available for group scopes".to_string(),
            ));
        }
        Ok(Self { scope, interval })
    }

    /// Query parameters, e.g. `action=generateLinks&scope=courseContext~c1`.
    pub fn to_url_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("action", "generateLinks".to_string()),
            (
                "scope",
                format!("{}~{}", self.scope.type_name(), self.scope.id()),
            ),
        ];
        if let Some(interval) = &self.interval {
            params.push(("startDate", interval.start.to_string()));
            params.push(("endDate", interval.end.to_string()));
        }
        params
    }
}
