//! Export requests and the enumerations that describe them.
//!
//! The wire format is camelCase JSON. The scope is an adjacently tagged union
//! keyed by `typeName` with the identifier nested under `definition`:
//!
//! ```json
//! {
//!   "scope": {"typeName": "courseContext", "definition": {"courseId": "c1"}},
//!   "exportType": "RESEARCH_WITH_SCHEMAS",
//!   "schemaNames": ["demographics", "users"]
//! }
//! ```

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

use crate::error_handling::ApiError;

/// The entity an export's rows are restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typeName", content = "definition")]
pub enum Scope {
    #[serde(rename = "courseContext")]
    Course {
        #[serde(rename = "courseId")]
        course_id: String,
    },
    #[serde(rename = "partnerContext")]
    Partner {
        #[serde(rename = "partnerId")]
        partner_id: PartnerId,
    },
    #[serde(rename = "groupContext")]
    Group {
        #[serde(rename = "groupId")]
        group_id: String,
    },
}

/// Partner identifiers are wrapped in a `maestroId` object on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerId {
    #[serde(rename = "maestroId")]
    pub maestro_id: i64,
}

impl Scope {
    pub fn course(course_id: impl Into<String>) -> Self {
        Scope::Course {
            course_id: course_id.into(),
        }
    }

    pub fn partner(partner_id: i64) -> Self {
        Scope::Partner {
            partner_id: PartnerId {
                maestro_id: partner_id,
            },
        }
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Scope::Group {
            group_id: group_id.into(),
        }
    }

    /// The `typeName` of this scope on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            Scope::Course { .. } => "courseContext",
            Scope::Partner { .. } => "partnerContext",
            Scope::Group { .. } => "groupContext",
        }
    }

    /// Display label: COURSE, PARTNER or GROUP.
    pub fn context(&self) -> &'static str {
        match self {
            Scope::Course { .. } => "COURSE",
            Scope::Partner { .. } => "PARTNER",
            Scope::Group { .. } => "GROUP",
        }
    }

    pub fn id(&self) -> String {
        match self {
            Scope::Course { course_id } => course_id.clone(),
            Scope::Partner { partner_id } => partner_id.maestro_id.to_string(),
            Scope::Group { group_id } => group_id.clone(),
        }
    }
}

/// The kind of data an export materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ExportKind {
    #[serde(rename = "RESEARCH_WITH_SCHEMAS")]
    #[strum(serialize = "TABLES")]
    Tables,
    #[serde(rename = "RESEARCH_EVENTING")]
    #[strum(serialize = "CLICKSTREAM")]
    Clickstream,
    #[serde(rename = "GRADEBOOK")]
    #[strum(serialize = "GRADEBOOK")]
    Gradebook,
}

/// Degree of user-id hashing applied server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnonymityLevel {
    /// User ids can be joined across schemas (data coordinators only).
    #[serde(rename = "HASHED_IDS_NO_PII")]
    CoordinatorLinked,
    /// User ids are hashed independently per schema.
    #[serde(rename = "HASHED_IDS_WITH_ISOLATED_UGC_NO_PII")]
    Isolated,
}

impl AnonymityLevel {
    pub fn display_name(&self) -> &'static str {
        match self {
            AnonymityLevel::CoordinatorLinked => "Linked",
            AnonymityLevel::Isolated => "Isolated",
        }
    }
}

/// CLI spelling of the anonymity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserIdHashing {
    Linked,
    Isolated,
}

impl From<UserIdHashing> for AnonymityLevel {
    fn from(hashing: UserIdHashing) -> Self {
        match hashing {
            UserIdHashing::Linked => AnonymityLevel::CoordinatorLinked,
            UserIdHashing::Isolated => AnonymityLevel::Isolated,
        }
    }
}

/// Named table schemas available in a tables export.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    EnumIter,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SchemaName {
    Demographics,
    Users,
    CourseMembership,
    CourseProgress,
    Feedback,
    Assessments,
    CourseGrades,
    PeerAssignments,
    Discussions,
    ProgrammingAssignments,
    CourseContent,
}

impl SchemaName {
    /// Every schema, in the order the API lists them.
    pub fn all() -> Vec<SchemaName> {
        SchemaName::iter().collect()
    }
}

/// Inclusive date range for clickstream exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A request for a research data export, before the server has accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub scope: Scope,
    pub export_type: ExportKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymity_level: Option<AnonymityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_of_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_names: Option<Vec<SchemaName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_existing: Option<bool>,
}

impl ExportRequest {
    /// A tables export. `None` selects every schema.
    pub fn tables(scope: Scope, schemas: Option<Vec<SchemaName>>) -> Self {
        let schemas = match schemas {
            Some(s) if !s.is_empty() => s,
            _ => SchemaName::all(),
        };
        Self {
            scope,
            export_type: ExportKind::Tables,
            anonymity_level: None,
            statement_of_purpose: None,
            schema_names: Some(schemas),
            interval: None,
            ignore_existing: None,
        }
    }

    /// A clickstream export. Clickstream data is always coordinator linked.
    pub fn clickstream(scope: Scope, interval: Option<Interval>, ignore_existing: bool) -> Self {
        Self {
            scope,
            export_type: ExportKind::Clickstream,
            anonymity_level: Some(AnonymityLevel::CoordinatorLinked),
            statement_of_purpose: None,
            schema_names: None,
            interval,
            ignore_existing: ignore_existing.then_some(true),
        }
    }

    pub fn gradebook(scope: Scope) -> Self {
        Self {
            scope,
            export_type: ExportKind::Gradebook,
            anonymity_level: None,
            statement_of_purpose: None,
            schema_names: None,
            interval: None,
            ignore_existing: None,
        }
    }

    pub fn with_anonymity_level(mut self, level: AnonymityLevel) -> Self {
        self.anonymity_level = Some(level);
        self
    }

    pub fn with_statement_of_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.statement_of_purpose = Some(purpose.into());
        self
    }

    /// Checks the invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.schema_names.is_some() && self.export_type != ExportKind::Tables {
            return Err(ApiError::InvalidRequest(format!(
                "schema names only apply to tables exports, not {}",
                self.export_type
            )));
        }
        if let Some(interval) = &self.interval {
            if interval.start > interval.end {
                return Err(ApiError::InvalidRequest(format!(
                    "interval start {} is after end {}",
                    interval.start, interval.end
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Serializing plain data with string keys cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        ExportRequest::deserialize(value)
    }

    /// "all" when every schema is selected, otherwise a comma separated list.
    pub fn schema_names_display(&self) -> Option<String> {
        let names = self.schema_names.as_ref()?;
        let mut selected: Vec<SchemaName> = names.clone();
        selected.sort_by_key(|s| s.as_ref().to_string());
        selected.dedup();
        let mut all = SchemaName::all();
        all.sort_by_key(|s| s.as_ref().to_string());
        if selected == all {
            Some("all".to_string())
        } else {
            Some(
                names
                    .iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
    }

    pub fn anonymity_display(&self) -> &'static str {
        self.anonymity_level
            .map(|level| level.display_name())
            .unwrap_or("Unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SCHEMA_NAMES;
    use serde_json::json;

    #[test]
    fn test_tables_request_default_schemas_json() {
        let request = ExportRequest::tables(Scope::course("c1"), None);
        assert_eq!(
            request.to_json(),
            json!({
                "scope": {"typeName": "courseContext", "definition": {"courseId": "c1"}},
                "exportType": "RESEARCH_WITH_SCHEMAS",
                "schemaNames": [
                    "demographics",
                    "users",
                    "course_membership",
                    "course_progress",
                    "feedback",
                    "assessments",
                    "course_grades",
                    "peer_assignments",
                    "discussions",
                    "programming_assignments",
                    "course_content"
                ]
            })
        );
    }

    #[test]
    fn test_schema_enum_matches_constant_list() {
        let names: Vec<String> = SchemaName::all()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, SCHEMA_NAMES);
    }

    #[test]
    fn test_partner_scope_json() {
        let request = ExportRequest::tables(Scope::partner(7), Some(vec![SchemaName::Users]));
        assert_eq!(
            request.to_json()["scope"],
            json!({"typeName": "partnerContext", "definition": {"partnerId": {"maestroId": 7}}})
        );
    }

    #[test]
    fn test_group_scope_json() {
        let request = ExportRequest::gradebook(Scope::group("g9"));
        let value = request.to_json();
        assert_eq!(
            value["scope"],
            json!({"typeName": "groupContext", "definition": {"groupId": "g9"}})
        );
        assert_eq!(value["exportType"], "GRADEBOOK");
        assert!(value.get("schemaNames").is_none());
    }

    #[test]
    fn test_clickstream_request_json() {
        let interval = Interval {
            start: NaiveDate::from_ymd_opt(2016, 8, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2016, 8, 4).unwrap(),
        };
        let request = ExportRequest::clickstream(Scope::course("c1"), Some(interval), true)
            .with_statement_of_purpose("research");
        let value = request.to_json();
        assert_eq!(value["exportType"], "RESEARCH_EVENTING");
        assert_eq!(value["anonymityLevel"], "HASHED_IDS_NO_PII");
        assert_eq!(value["interval"], json!({"start": "2016-08-01", "end": "2016-08-04"}));
        assert_eq!(value["ignoreExisting"], true);
        assert_eq!(value["statementOfPurpose"], "research");
    }

    #[test]
    fn test_round_trip_for_every_scope_and_kind() {
        let scopes = [Scope::course("c1"), Scope::partner(42), Scope::group("g1")];
        for scope in scopes {
            let requests = [
                ExportRequest::tables(scope.clone(), None)
                    .with_anonymity_level(AnonymityLevel::Isolated),
                ExportRequest::tables(
                    scope.clone(),
                    Some(vec![SchemaName::Feedback, SchemaName::CourseContent]),
                ),
                ExportRequest::clickstream(scope.clone(), None, false),
                ExportRequest::gradebook(scope.clone()).with_statement_of_purpose("grading"),
            ];
            for request in requests {
                let parsed = ExportRequest::from_json(&request.to_json()).expect("valid json");
                assert_eq!(parsed, request);
            }
        }
    }

    #[test]
    fn test_from_json_rejects_unknown_scope() {
        let value = json!({
            "scope": {"typeName": "planetContext", "definition": {"planetId": "x"}},
            "exportType": "GRADEBOOK"
        });
        assert!(ExportRequest::from_json(&value).is_err());
    }

    #[test]
    fn test_validate_rejects_schemas_on_clickstream() {
        let mut request = ExportRequest::clickstream(Scope::course("c1"), None, false);
        request.schema_names = Some(vec![SchemaName::Users]);
        assert!(matches!(
            request.validate(),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_rejects_reversed_interval() {
        let interval = Interval {
            start: NaiveDate::from_ymd_opt(2016, 8, 4).unwrap(),
            end: NaiveDate::from_ymd_opt(2016, 8, 1).unwrap(),
        };
        let request = ExportRequest::clickstream(Scope::course("c1"), Some(interval), false);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_schema_names_display() {
        let all = ExportRequest::tables(Scope::course("c1"), None);
        assert_eq!(all.schema_names_display().as_deref(), Some("all"));

        let some = ExportRequest::tables(
            Scope::course("c1"),
            Some(vec![SchemaName::Users, SchemaName::CourseGrades]),
        );
        assert_eq!(
            some.schema_names_display().as_deref(),
            Some("users,course_grades")
        );

        let none = ExportRequest::gradebook(Scope::course("c1"));
        assert_eq!(none.schema_names_display(), None);
    }

    #[test]
    fn test_export_kind_display() {
        assert_eq!(ExportKind::Tables.to_string(), "TABLES");
        assert_eq!(ExportKind::Clickstream.to_string(), "CLICKSTREAM");
        assert_eq!(ExportKind::Gradebook.to_string(), "GRADEBOOK");
    }

    #[test]
    fn test_user_id_hashing_maps_to_anonymity_level() {
        assert_eq!(
            AnonymityLevel::from(UserIdHashing::Linked),
            AnonymityLevel::CoordinatorLinked
        );
        assert_eq!(
            AnonymityLevel::from(UserIdHashing::Isolated),
            AnonymityLevel::Isolated
        );
    }
}
