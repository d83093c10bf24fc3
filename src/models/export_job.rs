//! Export jobs as tracked by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::export_request::{ExportKind, ExportRequest};

/// Server-driven lifecycle of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Terminated,
}

/// Bookkeeping timestamps attached by the server, in epoch milliseconds on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJobMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub snapshot_at: Option<DateTime<Utc>>,
}

/// An export request after the server accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: String,
    #[serde(flatten)]
    pub request: ExportRequest,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    download_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExportJobMetadata>,
}

impl ExportJob {
    pub fn new(id: impl Into<String>, request: ExportRequest, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            request,
            status,
            download_link: None,
            metadata: None,
        }
    }

    /// Attaches a download link; ignored unless the job is completed.
    pub fn with_download_link(mut self, link: impl Into<String>) -> Self {
        if self.status == JobStatus::Completed {
            self.download_link = Some(link.into());
        }
        self
    }

    pub fn with_metadata(mut self, metadata: ExportJobMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The signed archive URL. Only completed jobs expose one.
    pub fn download_link(&self) -> Option<&str> {
        match self.status {
            JobStatus::Completed => self.download_link.as_deref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ExportKind {
        self.request.export_type
    }

    /// Creation time, falling back to the epoch when the server omitted it.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.metadata
            .as_ref()
            .and_then(|m| m.created_at)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        ExportJob::deserialize(value)
    }
}

/// Sorts jobs by creation time, oldest first.
pub fn sort_by_created(jobs: &mut [ExportJob]) {
    jobs.sort_by_key(|job| job.created_at());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;
    use serde_json::json;

    fn completed_job_json() -> serde_json::Value {
        json!({
            "id": "job-1",
            "scope": {"typeName": "courseContext", "definition": {"courseId": "c1"}},
            "exportType": "RESEARCH_WITH_SCHEMAS",
            "anonymityLevel": "HASHED_IDS_WITH_ISOLATED_UGC_NO_PII",
            "schemaNames": ["users"],
            "status": "COMPLETED",
            "downloadLink": "https://example.com/exports/job-1.zip",
            "metadata": {
                "createdBy": 1234,
                "createdAt": 1470000000000i64,
                "startedAt": 1470000060000i64,
                "completedAt": 1470000600000i64,
                "snapshotAt": 1469990000000i64
            }
        })
    }

    #[test]
    fn test_parse_completed_job() {
        let job = ExportJob::from_json(&completed_job_json()).expect("valid job");
        assert_eq!(job.id, "job-1");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.kind(), ExportKind::Tables);
        assert_eq!(
            job.download_link(),
            Some("https://example.com/exports/job-1.zip")
        );
        assert_eq!(job.created_at().timestamp_millis(), 1_470_000_000_000);
    }

    #[test]
    fn test_metadata_round_trip() {
        let original = completed_job_json();
        let job = ExportJob::from_json(&original).unwrap();
        assert_eq!(job.to_json(), original);
    }

    #[test]
    fn test_download_link_hidden_unless_completed() {
        let mut value = completed_job_json();
        value["status"] = json!("IN_PROGRESS");
        let job = ExportJob::from_json(&value).unwrap();
        assert_eq!(job.download_link(), None);

        let pending = ExportJob::new(
            "job-2",
            ExportRequest::gradebook(Scope::course("c1")),
            JobStatus::Pending,
        )
        .with_download_link("https://example.com/x.zip");
        assert_eq!(pending.download_link(), None);
    }

    #[test]
    fn test_missing_metadata_sorts_first() {
        let request = ExportRequest::tables(Scope::course("c1"), None);
        let newer = ExportJob::new("new", request.clone(), JobStatus::Pending).with_metadata(
            ExportJobMetadata {
                created_at: DateTime::from_timestamp_millis(2_000),
                ..Default::default()
            },
        );
        let older = ExportJob::new("old", request.clone(), JobStatus::Pending).with_metadata(
            ExportJobMetadata {
                created_at: DateTime::from_timestamp_millis(1_000),
                ..Default::default()
            },
        );
        let unknown = ExportJob::new("unknown", request, JobStatus::Pending);

        let mut jobs = vec![newer, unknown, older];
        sort_by_created(&mut jobs);
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, ["unknown", "old", "new"]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::InProgress.to_string(), "IN_PROGRESS");
    }
}
