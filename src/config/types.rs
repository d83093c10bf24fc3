//! Configuration types and CLI options.
//!
//! This module defines the enums and structs used for command-line argument
//! parsing. Every subcommand of the binary is described here; the handlers
//! live in [`crate::commands`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    API_TIMEOUT_SECS, CLICKSTREAM_API, COURSE_API, DOCKER_TIMEOUT_SECS, LOCAL_EXPORTS_FOLDER,
    PARTNER_API, POLL_INTERVAL, POLL_MAX_ATTEMPTS, RESEARCH_EXPORTS_API,
};
use crate::containers::PollPolicy;
use crate::exports::ApiEndpoints;
use crate::models::{Interval, SchemaName, ScopeSelector, UserIdHashing};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command line tools for requesting, downloading and inspecting research
/// data exports.
///
/// # Examples
///
/// ```bash
/// # Request a tables export for a course
/// research_exports jobs request tables --course-slug machine-learning --purpose "..."
///
/// # Load a completed export into a local database container
/// research_exports containers create --export-request-id <ID>
///
/// # Dump a table to CSV
/// research_exports db unload_to_csv machine-learning --relation users --dest ./out
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "research_exports",
    version,
    about = "Tools for interacting with research data exports.",
    after_help = "Please file bugs on github at: \
        https://github.com/coursera/courseraresearchexports/issues."
)]
pub struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub api: ApiOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Export API endpoints and the local cache location.
#[derive(Debug, Clone, Args)]
pub struct ApiOptions {
    /// Base URL of the research exports API
    #[arg(long, env = "RESEARCH_EXPORTS_API", default_value = RESEARCH_EXPORTS_API, global = true, hide = true)]
    pub exports_api: String,

    /// Base URL of the course lookup API
    #[arg(long, env = "COURSE_API", default_value = COURSE_API, global = true, hide = true)]
    pub course_api: String,

    /// Base URL of the partner lookup API
    #[arg(long, env = "PARTNER_API", default_value = PARTNER_API, global = true, hide = true)]
    pub partner_api: String,

    /// Base URL of the clickstream download links API
    #[arg(long, env = "CLICKSTREAM_API", default_value = CLICKSTREAM_API, global = true, hide = true)]
    pub clickstream_api: String,

    /// Per-request timeout for API calls in seconds
    #[arg(long, default_value_t = API_TIMEOUT_SECS, global = true)]
    pub api_timeout_seconds: u64,

    /// Folder holding downloaded and extracted exports (default: ~/.coursera/exports)
    #[arg(long, env = "RESEARCH_EXPORTS_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,
}

impl ApiOptions {
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            exports: self.exports_api.clone(),
            courses: self.course_api.clone(),
            partners: self.partner_api.clone(),
            clickstream: self.clickstream_api.clone(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }

    /// Resolves the local exports folder, falling back to `~/.coursera/exports`.
    pub fn exports_folder(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(LOCAL_EXPORTS_FOLDER),
        }
    }
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            exports_api: RESEARCH_EXPORTS_API.to_string(),
            course_api: COURSE_API.to_string(),
            partner_api: PARTNER_API.to_string(),
            clickstream_api: CLICKSTREAM_API.to_string(),
            api_timeout_seconds: API_TIMEOUT_SECS,
            cache_dir: None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Output the version of research_exports to the console
    Version {
        /// Only print the version number
        #[arg(long, short)]
        quiet: bool,
    },

    /// Request exports and get the status of current/completed export jobs
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Create docker containers from export jobs
    Containers {
        #[command(flatten)]
        docker: DockerOptions,

        #[command(subcommand)]
        command: ContainersCommand,
    },

    /// Tools for interacting with a dockerized database
    Db {
        #[command(flatten)]
        docker: DockerOptions,

        #[command(subcommand)]
        command: DbCommand,
    },

    /// Configure API credentials
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Create and send a data export request
    Request {
        #[command(subcommand)]
        kind: RequestCommand,
    },

    /// Get the details and status of a data export request using a job id
    Get {
        /// Export request ID
        id: String,
    },

    /// Get the details and status of your data export requests
    #[command(name = "get_all")]
    GetAll,

    /// Download a data export job using a request id
    Download {
        /// Export request ID
        id: String,

        /// Destination folder
        #[arg(long, default_value = ".")]
        dest: PathBuf,
    },

    /// Get download links for completed clickstream exports
    #[command(name = "clickstream_download_links")]
    ClickstreamDownloadLinks {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Interval of exported clickstream data, inclusive (e.g. 2016-08-01 2016-08-04)
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        interval: Option<Vec<NaiveDate>>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RequestCommand {
    /// Create and send a tables data export request
    Tables(TablesRequestArgs),

    /// Create and send a clickstream data export request (data coordinators only)
    Clickstream(ClickstreamRequestArgs),
}

#[derive(Debug, Args)]
pub struct TablesRequestArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// How you plan to use the data, who will work with it and with whom it will be shared
    #[arg(long)]
    pub purpose: String,

    /// With 'linked' hashing users can be joined across schemas; 'isolated' ids cannot
    #[arg(long, alias = "user_id_hashing", value_enum, default_value_t = UserIdHashing::Isolated)]
    pub user_id_hashing: UserIdHashing,

    /// Data schemas to export (default: all available schemas)
    #[arg(long, value_enum, num_args = 1..)]
    pub schemas: Vec<SchemaName>,
}

#[derive(Debug, Args)]
pub struct ClickstreamRequestArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// How you plan to use the data, who will work with it and with whom it will be shared
    #[arg(long)]
    pub purpose: String,

    /// Interval of clickstream data to export (e.g. 2016-08-01 2016-08-04)
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    pub interval: Option<Vec<NaiveDate>>,

    /// Recompute clickstream data for every date in the interval
    #[arg(long, alias = "ignore_existing")]
    pub ignore_existing: bool,
}

/// The entity an export is restricted to. Exactly one must be given.
#[derive(Debug, Clone, Default, Args)]
#[group(required = true, multiple = false)]
pub struct ScopeArgs {
    /// Export rows for learners within a course, by course id
    #[arg(long, alias = "course_id")]
    pub course_id: Option<String>,

    /// Export rows for learners within a course, by slug (the part after /learn in the url)
    #[arg(long, alias = "course_slug")]
    pub course_slug: Option<String>,

    /// Export rows for learners within a partner, by partner id
    #[arg(long, alias = "partner_id")]
    pub partner_id: Option<i64>,

    /// Export rows for learners within a partner, by short name
    #[arg(long, alias = "partner_short_name")]
    pub partner_short_name: Option<String>,

    /// Export rows for learners within a group
    #[arg(long, alias = "group_id")]
    pub group_id: Option<String>,
}

impl ScopeArgs {
    /// Validates that exactly one identifier was supplied.
    pub fn selector(&self) -> Result<ScopeSelector, crate::error_handling::ApiError> {
        ScopeSelector::from_parts(
            self.course_id.clone(),
            self.course_slug.clone(),
            self.partner_id,
            self.partner_short_name.clone(),
            self.group_id.clone(),
        )
    }
}

/// Builds an [`Interval`] from the two dates of an `--interval START END` flag.
pub fn interval_from_args(dates: Option<&[NaiveDate]>) -> Option<Interval> {
    match dates {
        Some([start, end]) => Some(Interval {
            start: *start,
            end: *end,
        }),
        _ => None,
    }
}

/// Connection options for the docker daemon and readiness polling.
#[derive(Debug, Clone, Args)]
pub struct DockerOptions {
    /// The url of the docker daemon
    #[arg(long, env = "DOCKER_HOST")]
    pub docker_url: Option<String>,

    /// Timeout in seconds when interacting with the docker daemon
    #[arg(long, default_value_t = DOCKER_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Seconds to wait between two database readiness checks
    #[arg(long, default_value_t = POLL_INTERVAL.as_secs())]
    pub poll_interval_seconds: u64,

    /// Readiness checks before a container is considered failed
    #[arg(long, default_value_t = POLL_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub poll_max_attempts: u32,
}

impl DockerOptions {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_seconds),
            max_attempts: self.poll_max_attempts,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ContainersCommand {
    /// Create a container holding a postgres database loaded with an export (starts it)
    Create(CreateContainerArgs),

    /// List docker containers created with research exports
    List,

    /// Start a docker container
    Start {
        /// Name of the container
        container_name: String,
    },

    /// Stop a docker container
    Stop {
        /// Name of the container
        container_name: String,
    },

    /// Remove a stopped docker container
    Remove {
        /// Name of the container
        container_name: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateContainerArgs {
    #[command(flatten)]
    pub source: ContainerSource,

    /// Name of the container (default: course slug or partner short name)
    #[arg(long, alias = "container_name")]
    pub container_name: Option<String>,

    /// Name of the database (default: course slug or partner short name)
    #[arg(long, alias = "database_name")]
    pub database_name: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ContainerSource {
    /// Export job to download and load
    #[arg(long, alias = "export_request_id")]
    pub export_request_id: Option<String>,

    /// Folder holding an already extracted export
    #[arg(long, alias = "export_data_folder")]
    pub export_data_folder: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// List all of the tables present in a dockerized database
    #[command(name = "list_tables")]
    ListTables {
        /// Name of the container database
        container_name: String,
    },

    /// List all of the views present in a dockerized database
    #[command(name = "list_views")]
    ListViews {
        /// Name of the container database
        container_name: String,
    },

    /// Create a view from a packaged template or a sql file
    #[command(name = "create_view")]
    CreateView(CreateViewArgs),

    /// Unload a table or view to a CSV file
    #[command(name = "unload_to_csv")]
    UnloadToCsv {
        /// Name of the container database
        container_name: String,

        /// Destination folder
        #[arg(long, default_value = ".")]
        dest: PathBuf,

        /// Table or view to export
        #[arg(long)]
        relation: String,
    },

    /// Connect a postgres shell to a dockerized database
    Connect {
        /// Name of the container database
        container_name: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateViewArgs {
    /// Name of the container database
    pub container_name: String,

    #[command(flatten)]
    pub source: ViewSource,

    /// Value for the [partner_short_name] placeholder (inferred when omitted)
    #[arg(long, alias = "partner_short_name")]
    pub partner_short_name: Option<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ViewSource {
    /// Name of a packaged view
    #[arg(long, alias = "view_name")]
    pub view_name: Option<String>,

    /// SQL file with the view query
    #[arg(long, alias = "sql_file")]
    pub sql_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Store an access token obtained from the OAuth2 authorization flow
    Authorize {
        /// Access token (read from stdin when omitted)
        #[arg(long)]
        token: Option<String>,
    },

    /// Check that the stored credentials are accepted by the export API
    #[command(name = "check-auth")]
    CheckAuth,

    /// Display the local credential cache
    #[command(name = "display-auth-cache")]
    DisplayAuthCache {
        /// Do not truncate the keys [DANGER!!]
        #[arg(long)]
        no_truncate: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_interval_from_args() {
        let start = NaiveDate::from_ymd_opt(2016, 8, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2016, 8, 4).unwrap();
        let interval = interval_from_args(Some(&[start, end])).expect("two dates");
        assert_eq!(interval.start, start);
        assert_eq!(interval.end, end);
        assert!(interval_from_args(None).is_none());
    }

    #[test]
    fn test_exports_folder_override() {
        let options = ApiOptions {
            cache_dir: Some(PathBuf::from("/tmp/exports")),
            ..Default::default()
        };
        assert_eq!(options.exports_folder(), PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn test_exports_folder_default_under_home() {
        let options = ApiOptions::default();
        assert!(options.exports_folder().ends_with(".coursera/exports"));
    }

    #[test]
    fn test_poll_policy_from_options() {
        let docker = DockerOptions {
            docker_url: None,
            timeout: 60,
            poll_interval_seconds: 3,
            poll_max_attempts: 7,
        };
        let policy = docker.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(3));
        assert_eq!(policy.max_attempts, 7);
    }
}
