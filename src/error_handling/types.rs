//! Error type definitions.
//!
//! One enum per concern: API calls, archive download/extraction, container
//! provisioning, database access, credentials and initialization.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use thiserror::Error;

use crate::config::{AUTHORIZATION_HELP, DATA_EXPORTS_HELP, SUPPORT_CONTACT};
use crate::models::{ExportKind, JobStatus};

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error connecting to the docker daemon.
    #[error("Docker client initialization error: {0}")]
    DockerClientError(#[from] bollard::errors::Error),
}

/// Errors returned by the export, lookup and clickstream APIs.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 403: the caller must run the authorization flow again.
    #[error("Request to {url} was not authorized (403):\n\t{body}\n{help}", help = AUTHORIZATION_HELP)]
    Authorization { url: String, body: String },

    /// HTTP 404, or an empty element list for a single-object request.
    #[error("Resource not found at {url}:\n\t{body}\n{help}", help = DATA_EXPORTS_HELP)]
    NotFound { url: String, body: String },

    /// Any other non-2xx status.
    #[error("Request to {url} failed with status {status}:\n\t{body}\n{help}", help = DATA_EXPORTS_HELP)]
    Remote {
        url: String,
        status: u16,
        body: String,
    },

    /// A course or partner lookup failed.
    #[error("Could not resolve {what} '{value}': {reason}")]
    Lookup {
        what: &'static str,
        value: String,
        reason: String,
    },

    /// The scope identifiers supplied do not select exactly one entity.
    #[error("Exactly one of course id, course slug, partner id, partner short name or group id must be given ({0} supplied)")]
    InvalidScope(usize),

    /// The request is not valid for the chosen export kind.
    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    /// The response body could not be parsed.
    #[error("Unexpected response from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] ReqwestError),

    /// No usable credential was available.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors from downloading and extracting export archives.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The export is still being processed.
    #[error("Export request {id} is currently {status} and is not ready for download. Please wait until the request is completed.")]
    NotReady { id: String, status: JobStatus },

    /// The export failed permanently server side.
    #[error("Export request {id} has been TERMINATED. Please contact {contact} if we have not resolved this within 24 hours.", contact = SUPPORT_CONTACT)]
    Terminated { id: String },

    /// The export kind has no stored download link.
    #[error("Export request {id} is a {kind} export, which cannot be downloaded from a stored link")]
    UnsupportedExportKind { id: String, kind: ExportKind },

    /// A completed export without a download link.
    #[error("Download link was not found for export request {id}")]
    MissingDownloadLink { id: String },

    /// The archive could not be extracted.
    #[error("Failed to extract archive {archive}: {reason}")]
    CorruptArchive { archive: String, reason: String },

    /// The archive server answered with a non-2xx status.
    #[error("Failed to download {url}: status {status}")]
    Remote { url: String, status: u16 },

    #[error("Download I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download request failed: {0}")]
    Http(#[from] ReqwestError),
}

/// Why a container never became ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFailure {
    /// The container process stopped while we were polling.
    ProcessExited,
    /// The marker never appeared within the attempt budget.
    AttemptsExhausted(u32),
}

impl std::fmt::Display for StartupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupFailure::ProcessExited => f.write_str("the container process exited"),
            StartupFailure::AttemptsExhausted(n) => {
                write!(f, "the readiness marker did not appear after {n} attempts")
            }
        }
    }
}

/// Errors from container provisioning and lifecycle management.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Readiness marker never observed, process died or attempts exhausted.
    #[error("Container {container} failed to {phase}: {reason}. Check the log for errors:\n{log_tail}\nIf the error persists, consider restarting your docker engine.")]
    StartupTimeout {
        container: String,
        phase: &'static str,
        reason: StartupFailure,
        log_tail: String,
    },

    /// Removal was attempted on a running container.
    #[error("Container {0} is still running; stop it before removing")]
    Busy(String),

    #[error("Container {0} does not exist")]
    NotFound(String),

    /// The inspected container lacks data this tool relies on.
    #[error("Container {container} is missing {what}")]
    Malformed {
        container: String,
        what: &'static str,
    },

    /// The export data folder cannot be resolved to an absolute path.
    #[error("Cannot use export data folder '{folder}': {source}")]
    DataFolder {
        folder: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build container archive: {0}")]
    Archive(#[from] std::io::Error),

    #[error("Docker error: {0}")]
    Runtime(#[from] bollard::errors::Error),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The relation named does not exist in the database.
    #[error("Relation '{0}' does not exist")]
    RelationNotFound(String),

    /// Identifiers are interpolated into SQL and must be plain names.
    #[error("Invalid relation name '{0}': only letters, digits and underscores are allowed")]
    InvalidIdentifier(String),

    /// No packaged view exists with this name.
    #[error("Unknown view '{0}'")]
    UnknownView(String),

    /// The container has no published address (usually because it is stopped).
    #[error("Container {0} is not running; start it first")]
    ContainerNotRunning(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("Failed to write CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading or writing the local credential cache.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No token in the environment nor in the cache file.
    #[error("No access token found for {app}.\n{help}", help = AUTHORIZATION_HELP)]
    MissingCredentials { app: String },

    #[error("Failed to access credential cache {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential cache {path} is corrupt: {source}")]
    CorruptCache {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
