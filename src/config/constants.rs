//! Configuration constants.
//!
//! API endpoints, wire-format enumerations, container settings and polling
//! parameters used throughout the application.

use std::time::Duration;

// Export API
/// OAuth2 application name the export API credentials are registered under
pub const RESEARCH_EXPORTS_APP: &str = "manage_research_exports";
pub const RESEARCH_EXPORTS_API: &str = "https://www.coursera.org/api/onDemandExports.v2/";
pub const COURSE_API: &str = "https://www.coursera.org/api/onDemandCourses.v1/";
pub const PARTNER_API: &str = "https://www.coursera.org/api/partners.v1/";
pub const CLICKSTREAM_API: &str = "https://www.coursera.org/api/clickstreamExportsDownload.v1/";

/// Per-request timeout for API calls in seconds
pub const API_TIMEOUT_SECS: u64 = 60;
/// Timeout for archive downloads in seconds (archives can be several GB)
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60 * 60;

/// Environment variable that overrides the cached bearer token
pub const ACCESS_TOKEN_ENV: &str = "RESEARCH_EXPORTS_ACCESS_TOKEN";

/// Help text shown when the export API rejects our credentials (HTTP 403)
pub const AUTHORIZATION_HELP: &str = "Please authorize this application by running:\n\
    \t$ research_exports config authorize --token <ACCESS_TOKEN>\n\
    The token must be issued for the manage_research_exports application.\n\
    For further assistance, consult the Coursera Data Exports Guide \
    https://partner.coursera.help/hc/en-us/articles/360021121132.";

/// Help text attached to every other API failure
pub const DATA_EXPORTS_HELP: &str = "Please consult the Coursera Data Exports Guide for further \
    assistance: https://partner.coursera.help/hc/en-us/articles/360021121132.";

/// Contact shown when an export was terminated server side
pub const SUPPORT_CONTACT: &str = "data-support@coursera.org";

/// All schemas that may be requested in a tables export, in API order
pub const SCHEMA_NAMES: &[&str] = &[
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
    "course_content",
];

// Local state
/// Folder under the home directory where archives and extracted exports live
pub const LOCAL_EXPORTS_FOLDER: &str = ".coursera/exports";
/// Folder under the home directory holding the OAuth2 token cache
pub const LOCAL_AUTH_FOLDER: &str = ".coursera";
/// Fallback file name when a download URL has no usable last path segment
pub const DEFAULT_ARCHIVE_NAME: &str = "export.zip";

// Container settings
/// Label every container created by this tool carries
pub const DOCKER_LABEL: &str = "courseraResearchExport";
/// Label holding the name of the database inside the container
pub const DATABASE_NAME_LABEL: &str = "database_name";
pub const POSTGRES_DOCKER_IMAGE: &str = "postgres:9.5";
pub const POSTGRES_USER: &str = "postgres";
pub const POSTGRES_CONTAINER_PORT: &str = "5432/tcp";
/// Host port used when no labeled container exists yet
pub const DEFAULT_HOST_PORT: u16 = 5433;
/// Mount point of the extracted export inside the container
pub const EXPORT_DATA_MOUNT: &str = "/mnt/exportData";
pub const INIT_SCRIPT_DIR: &str = "/docker-entrypoint-initdb.d/";
pub const INIT_SCRIPT_NAME: &str = "init-user-db.sh";
pub const DEFAULT_CONTAINER_NAME: &str = "coursera-exports";
pub const DOCKER_TIMEOUT_SECS: u64 = 60;

// Readiness polling
pub const POSTGRES_INIT_MSG: &str = "PostgreSQL init process complete; ready for start up.";
pub const POSTGRES_READY_MSG: &str = "database system is ready to accept connections";
/// Delay between two readiness polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Maximum number of readiness polls before giving up (10 minutes at the default interval)
pub const POLL_MAX_ATTEMPTS: u32 = 60;
/// Log lines scanned for the ready marker
pub const READY_LOG_TAIL: usize = 4;
/// Log lines scanned for the init marker and attached to startup failures
pub const INIT_LOG_TAIL: usize = 20;

// Views
pub const PARTNER_SHORT_NAME_PLACEHOLDER: &str = "[partner_short_name]";
/// Hashed user id placeholders and the table whose `*_user_id` column replaces them
pub const HASHED_USER_ID_COLUMN_TO_SOURCE_TABLE: &[(&str, &str)] = &[
    ("[partner_user_id]", "users"),
    ("[demographics_user_id]", "demographics_answers"),
    ("[feedback_user_id]", "feedback_course_ratings"),
    ("[assessments_user_id]", "assessment_actions"),
    ("[peer_assignments_user_id]", "peer_submissions"),
    ("[discussions_user_id]", "discussion_answers"),
    ("[programming_assignments_user_id]", "programming_submissions"),
];
