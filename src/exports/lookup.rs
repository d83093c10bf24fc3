//! Course and partner lookups.
//!
//! Slugs and short names are resolved to ids before a request is sent, and
//! ids are resolved back to names for display and container naming. Any
//! failure surfaces as [`ApiError::Lookup`].

use serde::Deserialize;

use super::api::{parse_elements, send, ApiEndpoints, ExportClient};
use crate::error_handling::ApiError;
use crate::models::{Scope, ScopeSelector};

#[derive(Debug, Deserialize)]
struct CourseElement {
    id: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartnerElement {
    // Partner ids come back as strings or numbers depending on the endpoint
    id: serde_json::Value,
    short_name: String,
}

impl PartnerElement {
    fn numeric_id(&self) -> Option<i64> {
        match &self.id {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl ExportClient {
    async fn lookup_first<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        what: &'static str,
        value: &str,
    ) -> Result<T, ApiError> {
        let result = async {
            let body = send(self.http().get(url).query(query), url).await?;
            parse_elements::<T>(url, &body)
        }
        .await;

        match result {
            Ok(parsed) => parsed.elements.into_iter().next().ok_or_else(|| ApiError::Lookup {
                what,
                value: value.to_string(),
                reason: "no matching element".to_string(),
            }),
            Err(e) => Err(ApiError::Lookup {
                what,
                value: value.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Course id for a slug.
    pub async fn course_id(&self, slug: &str) -> Result<String, ApiError> {
        let course: CourseElement = self
            .lookup_first(
                &self.endpoints().courses,
                &[("q", "slug"), ("slug", slug)],
                "course slug",
                slug,
            )
            .await?;
        Ok(course.id)
    }

    /// Slug for a course id.
    pub async fn course_slug(&self, course_id: &str) -> Result<String, ApiError> {
        let url = ApiEndpoints::join(&self.endpoints().courses, course_id);
        let course: CourseElement = self
            .lookup_first(&url, &[], "course id", course_id)
            .await?;
        Ok(course.slug)
    }

    /// Partner id for a short name.
    pub async fn partner_id(&self, short_name: &str) -> Result<i64, ApiError> {
        let partner: PartnerElement = self
            .lookup_first(
                &self.endpoints().partners,
                &[("q", "shortName"), ("shortName", short_name)],
                "partner short name",
                short_name,
            )
            .await?;
        partner.numeric_id().ok_or_else(|| ApiError::Lookup {
            what: "partner short name",
            value: short_name.to_string(),
            reason: format!("non-numeric partner id {}", partner.id),
        })
    }

    /// Short name for a partner id.
    pub async fn partner_short_name(&self, partner_id: i64) -> Result<String, ApiError> {
        let id = partner_id.to_string();
        let url = ApiEndpoints::join(&self.endpoints().partners, &id);
        let partner: PartnerElement = self.lookup_first(&url, &[], "partner id", &id).await?;
        Ok(partner.short_name)
    }

    /// Turns a command-line selector into a wire scope, resolving slugs and
    /// short names.
    pub async fn resolve_scope(&self, selector: &ScopeSelector) -> Result<Scope, ApiError> {
        Ok(match selector {
            ScopeSelector::CourseId(id) => Scope::course(id.clone()),
            ScopeSelector::CourseSlug(slug) => Scope::course(self.course_id(slug).await?),
            ScopeSelector::PartnerId(id) => Scope::partner(*id),
            ScopeSelector::PartnerShortName(name) => Scope::partner(self.partner_id(name).await?),
            ScopeSelector::GroupId(id) => Scope::group(id.clone()),
        })
    }

    /// Human readable name of a scope: course slug or partner short name.
    /// Groups have no name lookup and use their id.
    pub async fn scope_name(&self, scope: &Scope) -> Result<String, ApiError> {
        match scope {
            Scope::Course { course_id } => self.course_slug(course_id).await,
            Scope::Partner { partner_id } => self.partner_short_name(partner_id.maestro_id).await,
            Scope::Group { group_id } => Ok(group_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::StaticTokenProvider;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use serde_json::json;

    fn client_for(server: &Server) -> ExportClient {
        ExportClient::new(
            Arc::new(reqwest::Client::new()),
            ApiEndpoints {
                exports: server.url_str("/exports/"),
                courses: server.url_str("/courses/"),
                partners: server.url_str("/partners/"),
                clickstream: server.url_str("/clickstream/"),
            },
            Arc::new(StaticTokenProvider("tok".to_string())),
        )
    }

    #[tokio::test]
    async fn test_resolve_course_slug() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/courses/"),
                request::query(url_decoded(contains(("q", "slug")))),
                request::query(url_decoded(contains(("slug", "machine-learning")))),
            ])
            .respond_with(json_encoded(json!({
                "elements": [{"id": "Gtv4Xb1-EeS-ViIACwYKVQ", "slug": "machine-learning"}]
            }))),
        );

        let scope = client_for(&server)
            .resolve_scope(&ScopeSelector::CourseSlug("machine-learning".into()))
            .await
            .unwrap();
        assert_eq!(scope, Scope::course("Gtv4Xb1-EeS-ViIACwYKVQ"));
    }

    #[tokio::test]
    async fn test_resolve_partner_short_name_with_string_id() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/partners/")).respond_with(
                json_encoded(json!({"elements": [{"id": "17", "shortName": "stanford"}]})),
            ),
        );

        let scope = client_for(&server)
            .resolve_scope(&ScopeSelector::PartnerShortName("stanford".into()))
            .await
            .unwrap();
        assert_eq!(scope, Scope::partner(17));
    }

    #[tokio::test]
    async fn test_unknown_slug_is_lookup_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/courses/"))
                .respond_with(json_encoded(json!({"elements": []}))),
        );

        let err = client_for(&server).course_id("nope").await.unwrap_err();
        match err {
            ApiError::Lookup { what, value, .. } => {
                assert_eq!(what, "course slug");
                assert_eq!(value, "nope");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scope_name_for_partner() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/partners/17")).respond_with(
                json_encoded(json!({"elements": [{"id": 17, "shortName": "stanford"}]})),
            ),
        );

        let name = client_for(&server)
            .scope_name(&Scope::partner(17))
            .await
            .unwrap();
        assert_eq!(name, "stanford");
    }

    #[tokio::test]
    async fn test_scope_name_for_group_needs_no_lookup() {
        let server = Server::run();
        let name = client_for(&server)
            .scope_name(&Scope::group("g1"))
            .await
            .unwrap();
        assert_eq!(name, "g1");
    }
}
