//! `containers` subcommands: provision and manage database containers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::jobs::is_loadable;
use super::table::Table;
use super::{download_client, export_client};
use crate::config::{ApiOptions, ContainersCommand, CreateContainerArgs, DEFAULT_CONTAINER_NAME};
use crate::containers::{ContainerProvisioner, ContainerRuntime};
use crate::exports::{ArchiveFetcher, ExportClient};
use crate::models::ContainerRecord;

pub async fn run<R: ContainerRuntime>(
    api: &ApiOptions,
    provisioner: &ContainerProvisioner<R>,
    command: ContainersCommand,
) -> Result<()> {
    match command {
        ContainersCommand::Create(args) => create(api, provisioner, args).await,
        ContainersCommand::List => {
            let records = provisioner
                .list_all()
                .await
                .context("Failed to list containers")?;
            print!("{}", containers_table(&records));
            Ok(())
        }
        ContainersCommand::Start { container_name } => provisioner
            .start(&container_name)
            .await
            .with_context(|| format!("Failed to start container {container_name}")),
        ContainersCommand::Stop { container_name } => provisioner
            .stop(&container_name)
            .await
            .with_context(|| format!("Failed to stop container {container_name}")),
        ContainersCommand::Remove { container_name } => provisioner
            .remove(&container_name)
            .await
            .with_context(|| format!("Failed to remove container {container_name}")),
    }
}

async fn create<R: ContainerRuntime>(
    api: &ApiOptions,
    provisioner: &ContainerProvisioner<R>,
    args: CreateContainerArgs,
) -> Result<()> {
    let needs_scope_name = args.container_name.is_none() || args.database_name.is_none();
    let (folder, scope_name) = match (
        args.source.export_request_id,
        args.source.export_data_folder,
    ) {
        (Some(id), _) => {
            let client = export_client(api)?;
            let fetcher = ArchiveFetcher::new(download_client(api)?);
            fetch_export(&client, &fetcher, &api.exports_folder(), &id, needs_scope_name).await?
        }
        (None, Some(folder)) => {
            if !folder.is_dir() {
                bail!("Export data folder {} does not exist", folder.display());
            }
            (folder, None)
        }
        (None, None) => bail!("Either --export-request-id or --export-data-folder is required"),
    };

    let default_name = scope_name.unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string());
    let container_name = args.container_name.unwrap_or_else(|| default_name.clone());
    let database_name = args.database_name.unwrap_or(default_name);

    let id = provisioner
        .provision(&folder, &container_name, &database_name)
        .await
        .with_context(|| format!("Failed to provision container {container_name}"))?;

    let record = provisioner.describe(&id).await?;
    log::info!(
        "Container {} ({}) is ready with database {} on port {}",
        record.name,
        record.short_id(),
        record.database_name,
        record.host_port
    );
    println!("{}", record.name);
    Ok(())
}

/// Downloads and extracts a tables export into `cache`. Returns the extracted
/// folder, plus the scope's readable name when `with_scope_name` is set.
async fn fetch_export(
    client: &ExportClient,
    fetcher: &ArchiveFetcher,
    cache: &Path,
    id: &str,
    with_scope_name: bool,
) -> Result<(PathBuf, Option<String>)> {
    let job = client
        .get(id)
        .await
        .with_context(|| format!("Failed to get export job {id}"))?;
    if !is_loadable(&job) {
        bail!(
            "Export job {} is a {} export; only tables exports can be loaded into a database",
            job.id,
            job.kind()
        );
    }

    let scope_name = if with_scope_name {
        Some(
            client
                .scope_name(&job.request.scope)
                .await
                .context("Failed to look up the export's scope name")?,
        )
    } else {
        None
    };

    let archive = fetcher
        .download(&job, cache)
        .await
        .with_context(|| format!("Failed to download export job {}", job.id))?;
    let folder = fetcher
        .extract(&archive, &cache.join(&job.id))
        .await
        .with_context(|| format!("Failed to extract {}", archive.display()))?;
    Ok((folder, scope_name))
}

fn containers_table(records: &[ContainerRecord]) -> Table {
    let mut table = Table::new([
        "Name",
        "Container Id",
        "Database",
        "Created",
        "Status",
        "Host Ip",
        "Port",
    ]);
    for record in records {
        table.push([
            record.name.clone(),
            record.short_id().to_string(),
            record.database_name.clone(),
            record.created.format("%Y-%m-%d %H:%M").to_string(),
            record.status.to_string(),
            record.host_ip.clone().unwrap_or_default(),
            record.host_port.to_string(),
        ]);
    }
    table
}
