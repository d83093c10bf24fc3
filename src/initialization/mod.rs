//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources a
//! command needs:
//! - Logger
//! - HTTP clients for the APIs and for archive downloads
//! - Docker daemon connection
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod docker;
mod logger;

// Re-export public API
pub use client::{init_client, init_download_client};
pub use docker::init_docker;
pub use logger::init_logger_with;
