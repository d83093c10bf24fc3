//! research_exports library: request, download and load research data exports
//!
//! The pipeline runs in four stages, each gated on the previous one:
//!
//! 1. [`exports::ExportClient`] creates and polls export jobs on the export API
//! 2. [`exports::ArchiveFetcher`] downloads a completed job's archive and extracts it
//! 3. [`containers::ContainerProvisioner`] loads the extracted data into a
//!    postgres container
//! 4. [`db::RelationAccessor`] lists relations, creates views and unloads CSV files
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use research_exports::auth::CachedTokenProvider;
//! use research_exports::config::ApiOptions;
//! use research_exports::exports::ExportClient;
//! use research_exports::initialization::init_client;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiOptions::default();
//! let client = ExportClient::new(
//!     init_client(&api)?,
//!     api.endpoints(),
//!     Arc::new(CachedTokenProvider::new()),
//! );
//! for job in client.list_mine().await? {
//!     println!("{} {}", job.id, job.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Container operations need a reachable
//! docker daemon.

pub mod auth;
pub mod commands;
pub mod config;
pub mod containers;
pub mod db;
pub mod error_handling;
pub mod exports;
pub mod initialization;
pub mod models;

// Re-export public API
pub use commands::run;
pub use config::{Cli, LogFormat, LogLevel};
