//! Error handling.
//!
//! Errors are grouped by the stage of the export pipeline that raises them:
//! - **ApiError**: export, lookup and clickstream API calls
//! - **DownloadError**: archive download and extraction
//! - **ContainerError**: container provisioning and lifecycle
//! - **DatabaseError**: relation introspection, views and unloads
//! - **AuthError**: the local credential cache
//! - **InitializationError**: logger and client setup

mod types;

// Re-export public API
pub use types::{
    ApiError, AuthError, ContainerError, DatabaseError, DownloadError, InitializationError,
    StartupFailure,
};
