//! Export API client.
//!
//! Every endpoint wraps its payload in `{"elements": [...]}`. Status codes are
//! mapped onto [`ApiError`] before any body is parsed:
//! - 403: [`ApiError::Authorization`]
//! - 404: [`ApiError::NotFound`]
//! - any other non-2xx: [`ApiError::Remote`]

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::CredentialProvider;
use crate::config::RESEARCH_EXPORTS_APP;
use crate::error_handling::ApiError;
use crate::models::{ClickstreamLinksRequest, ExportJob, ExportRequest};

/// Base URLs of the remote APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub exports: String,
    pub courses: String,
    pub partners: String,
    pub clickstream: String,
}

impl ApiEndpoints {
    /// Appends a path segment to a base URL.
    pub(crate) fn join(base: &str, segment: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), segment)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Elements<T> {
    #[serde(default = "Vec::new")]
    pub(crate) elements: Vec<T>,
}

/// Client for creating, fetching and listing export jobs.
pub struct ExportClient {
    http: Arc<reqwest::Client>,
    endpoints: ApiEndpoints,
    credentials: Arc<dyn CredentialProvider>,
}

impl ExportClient {
    pub fn new(
        http: Arc<reqwest::Client>,
        endpoints: ApiEndpoints,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            endpoints,
            credentials,
        }
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.credentials.access_token(RESEARCH_EXPORTS_APP)?;
        Ok(builder.bearer_auth(token))
    }

    /// Submits a new export request.
    pub async fn create(&self, request: &ExportRequest) -> Result<ExportJob, ApiError> {
        request.validate()?;
        let url = self.endpoints.exports.clone();
        log::debug!("Creating export request: {}", request.to_json());

        let builder = self.authorized(self.http.post(&url).json(request))?;
        let body = send(builder, &url).await?;
        first_element(&url, &body)
    }

    /// Fetches a single export job by id.
    pub async fn get(&self, id: &str) -> Result<ExportJob, ApiError> {
        let url = ApiEndpoints::join(&self.endpoints.exports, id);
        let builder = self.authorized(self.http.get(&url))?;
        let body = send(builder, &url).await?;
        first_element(&url, &body)
    }

    /// Lists the caller's export jobs. The server returns at most the 100
    /// most recent ones, in no particular order.
    pub async fn list_mine(&self) -> Result<Vec<ExportJob>, ApiError> {
        let url = self.endpoints.exports.clone();
        let builder = self.authorized(self.http.get(&url).query(&[("q", "my")]))?;
        let body = send(builder, &url).await?;
        Ok(parse_elements::<ExportJob>(&url, &body)?.elements)
    }

    /// Generates signed download links for clickstream data.
    pub async fn clickstream_download_links(
        &self,
        request: &ClickstreamLinksRequest,
    ) -> Result<Vec<String>, ApiError> {
        let url = self.endpoints.clickstream.clone();
        let builder = self.authorized(self.http.post(&url).query(&request.to_url_params()))?;
        let body = send(builder, &url).await?;
        serde_json::from_str(&body).map_err(|source| ApiError::InvalidResponse { url, source })
    }
}

/// Sends the request and returns the body of a 2xx response.
pub(crate) async fn send(builder: RequestBuilder, url: &str) -> Result<String, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "No error details".to_string());

    match status {
        StatusCode::FORBIDDEN => Err(ApiError::Authorization {
            url: url.to_string(),
            body,
        }),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound {
            url: url.to_string(),
            body,
        }),
        s if !s.is_success() => {
            log::debug!("{} returned {}: {}", url, s, body);
            Err(ApiError::Remote {
                url: url.to_string(),
                status: s.as_u16(),
                body,
            })
        }
        _ => Ok(body),
    }
}

pub(crate) fn parse_elements<T: DeserializeOwned>(
    url: &str,
    body: &str,
) -> Result<Elements<T>, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::InvalidResponse {
        url: url.to_string(),
        source,
    })
}

/// The first element of a single-object response; an empty list means not found.
fn first_element<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    parse_elements::<T>(url, body)?
        .elements
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound {
            url: url.to_string(),
            body: body.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::models::{JobStatus, Scope};
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use serde_json::json;

    fn client_for(server: &Server) -> ExportClient {
        let endpoints = ApiEndpoints {
            exports: server.url_str("/api/onDemandExports.v2/"),
            courses: server.url_str("/api/onDemandCourses.v1/"),
            partners: server.url_str("/api/partners.v1/"),
            clickstream: server.url_str("/api/clickstreamExportsDownload.v1/"),
        };
        ExportClient::new(
            Arc::new(reqwest::Client::new()),
            endpoints,
            Arc::new(StaticTokenProvider("tok".to_string())),
        )
    }

    fn job_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "scope": {"typeName": "courseContext", "definition": {"courseId": "c1"}},
            "exportType": "RESEARCH_WITH_SCHEMAS",
            "schemaNames": ["users"],
            "status": status
        })
    }

    #[test]
    fn test_join_trims_trailing_slash() {
        assert_eq!(
            ApiEndpoints::join("https://example.com/api/v2/", "abc"),
            "https://example.com/api/v2/abc"
        );
        assert_eq!(
            ApiEndpoints::join("https://example.com/api/v2", "abc"),
            "https://example.com/api/v2/abc"
        );
    }

    #[tokio::test]
    async fn test_get_sends_bearer_token() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/api/onDemandExports.v2/job-1"),
                request::headers(contains(("authorization", "Bearer tok"))),
            ])
            .respond_with(json_encoded(json!({"elements": [job_json("job-1", "PENDING")]}))),
        );

        let job = client_for(&server).get("job-1").await.unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_empty_elements_is_not_found() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/api/onDemandExports.v2/gone"))
                .respond_with(json_encoded(json!({"elements": []}))),
        );

        let err = client_for(&server).get("gone").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/api/onDemandExports.v2/forbidden"))
                .respond_with(status_code(403).body("not allowed")),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/api/onDemandExports.v2/missing"))
                .respond_with(status_code(404).body("no such job")),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/api/onDemandExports.v2/broken"))
                .respond_with(status_code(500).body("boom")),
        );
        let client = client_for(&server);

        match client.get("forbidden").await.unwrap_err() {
            ApiError::Authorization { body, .. } => assert_eq!(body, "not allowed"),
            other => panic!("unexpected error: {other:?}"),
        }
        match client.get("missing").await.unwrap_err() {
            ApiError::NotFound { body, .. } => assert_eq!(body, "no such job"),
            other => panic!("unexpected error: {other:?}"),
        }
        match client.get("broken").await.unwrap_err() {
            ApiError::Remote { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_posts_request_body() {
        let server = Server::run();
        let request = ExportRequest::tables(Scope::course("c1"), None);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/api/onDemandExports.v2/"),
                request::body(json_decoded(eq(request.to_json()))),
            ])
            .respond_with(json_encoded(json!({"elements": [job_json("new-job", "PENDING")]}))),
        );

        let job = client_for(&server).create(&request).await.unwrap();
        assert_eq!(job.id, "new-job");
        assert_eq!(job.request.scope, Scope::course("c1"));
    }

    #[tokio::test]
    async fn test_list_mine_uses_my_query() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/api/onDemandExports.v2/"),
                request::query(url_decoded(contains(("q", "my")))),
            ])
            .respond_with(json_encoded(json!({
                "elements": [job_json("a", "COMPLETED"), job_json("b", "TERMINATED")]
            }))),
        );

        let jobs = client_for(&server).list_mine().await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].status, JobStatus::Terminated);
    }

    #[tokio::test]
    async fn test_clickstream_links() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/api/clickstreamExportsDownload.v1/"),
                request::query(url_decoded(contains(("action", "generateLinks")))),
                request::query(url_decoded(contains(("scope", "courseContext~c1")))),
            ])
            .respond_with(json_encoded(json!([
                "https://example.com/a.csv.gz",
                "https://example.com/b.csv.gz"
            ]))),
        );

        let request = ClickstreamLinksRequest::new(Scope::course("c1"), None).unwrap();
        let links = client_for(&server)
            .clickstream_download_links(&request)
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
    }
}
