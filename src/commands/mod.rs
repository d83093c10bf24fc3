//! Command handlers.
//!
//! Each submodule handles one top-level subcommand. Handlers return
//! `anyhow::Result` with context attached; `main` prints the chain and exits.

mod config;
mod containers;
mod db;
mod jobs;
mod table;
mod version;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::auth::CachedTokenProvider;
use crate::config::{ApiOptions, Cli, Command, DockerOptions};
use crate::containers::{ContainerProvisioner, DockerRuntime};
use crate::exports::ExportClient;
use crate::initialization::{init_client, init_docker, init_download_client};

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Version { quiet } => {
            version::run(quiet);
            Ok(())
        }
        Command::Jobs { command } => jobs::run(&cli.api, command).await,
        Command::Containers { docker, command } => {
            let provisioner = provisioner(&docker)?;
            containers::run(&cli.api, &provisioner, command).await
        }
        Command::Db { docker, command } => {
            let provisioner = provisioner(&docker)?;
            db::run(&provisioner, command).await
        }
        Command::Config { command } => config::run(&cli.api, command).await,
    }
}

pub(crate) fn export_client(api: &ApiOptions) -> Result<ExportClient> {
    let http = init_client(api).context("Failed to initialize HTTP client")?;
    Ok(ExportClient::new(
        http,
        api.endpoints(),
        Arc::new(CachedTokenProvider::new()),
    ))
}

pub(crate) fn download_client(api: &ApiOptions) -> Result<Arc<reqwest::Client>> {
    init_download_client(api).context("Failed to initialize download client")
}

fn provisioner(docker: &DockerOptions) -> Result<ContainerProvisioner<DockerRuntime>> {
    let runtime = init_docker(docker).context("Failed to connect to the docker daemon")?;
    Ok(ContainerProvisioner::new(runtime, docker.poll_policy()))
}
