//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (endpoints, container settings, polling)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    interval_from_args, ApiOptions, Cli, ClickstreamRequestArgs, Command, ConfigCommand,
    ContainerSource, ContainersCommand, CreateContainerArgs, CreateViewArgs, DbCommand,
    DockerOptions, JobsCommand, LogFormat, LogLevel, RequestCommand, ScopeArgs,
    TablesRequestArgs, ViewSource,
};
