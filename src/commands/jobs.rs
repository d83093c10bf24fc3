//! `jobs` subcommands: request, inspect and download export jobs.

use std::path::Path;

use anyhow::{Context, Result};

use super::table::{detail_table, Table};
use super::{download_client, export_client};
use crate::config::{
    interval_from_args, ApiOptions, ClickstreamRequestArgs, JobsCommand, RequestCommand,
    ScopeArgs, TablesRequestArgs,
};
use crate::error_handling::DownloadError;
use crate::exports::{check_downloadable, ArchiveFetcher, ExportClient};
use crate::models::{
    sort_by_created, ClickstreamLinksRequest, ExportJob, ExportKind, ExportRequest,
};

pub async fn run(api: &ApiOptions, command: JobsCommand) -> Result<()> {
    let client = export_client(api)?;
    match command {
        JobsCommand::Request { kind } => {
            let request = match kind {
                RequestCommand::Tables(args) => tables_request(&client, args).await?,
                RequestCommand::Clickstream(args) => clickstream_request(&client, args).await?,
            };
            let job = client
                .create(&request)
                .await
                .context("Failed to create export request")?;
            log::info!("Successfully created request {}.", job.id);
            println!("{}", job.id);
        }
        JobsCommand::Get { id } => {
            let job = client
                .get(&id)
                .await
                .with_context(|| format!("Failed to get export job {id}"))?;
            print!("{}", job_details(&client, &job).await);
        }
        JobsCommand::GetAll => {
            let mut jobs = client
                .list_mine()
                .await
                .context("Failed to list export jobs")?;
            sort_by_created(&mut jobs);
            print!("{}", jobs_table(&jobs));
        }
        JobsCommand::Download { id, dest } => {
            let job = client
                .get(&id)
                .await
                .with_context(|| format!("Failed to get export job {id}"))?;
            let fetcher = ArchiveFetcher::new(download_client(api)?);
            for path in download(&client, &fetcher, &job, &dest).await? {
                println!("{}", path.display());
            }
        }
        JobsCommand::ClickstreamDownloadLinks { scope, interval } => {
            let scope = resolve(&client, &scope).await?;
            let request =
                ClickstreamLinksRequest::new(scope, interval_from_args(interval.as_deref()))?;
            let links = client
                .clickstream_download_links(&request)
                .await
                .context("Failed to get clickstream download links")?;
            if links.is_empty() {
                log::warn!("No clickstream data available for this scope and interval.");
            }
            for link in links {
                println!("{link}");
            }
        }
    }
    Ok(())
}

async fn resolve(client: &ExportClient, scope: &ScopeArgs) -> Result<crate::models::Scope> {
    let selector = scope.selector()?;
    client
        .resolve_scope(&selector)
        .await
        .context("Failed to resolve export scope")
}

async fn tables_request(client: &ExportClient, args: TablesRequestArgs) -> Result<ExportRequest> {
    let scope = resolve(client, &args.scope).await?;
    let schemas = (!args.schemas.is_empty()).then_some(args.schemas);
    Ok(ExportRequest::tables(scope, schemas)
        .with_anonymity_level(args.user_id_hashing.into())
        .with_statement_of_purpose(args.purpose))
}

async fn clickstream_request(
    client: &ExportClient,
    args: ClickstreamRequestArgs,
) -> Result<ExportRequest> {
    let scope = resolve(client, &args.scope).await?;
    let interval = interval_from_args(args.interval.as_deref());
    Ok(
        ExportRequest::clickstream(scope, interval, args.ignore_existing)
            .with_statement_of_purpose(args.purpose),
    )
}

/// Downloads a completed job into `dest/<job id>/`.
///
/// Clickstream jobs have no single archive; their data is fetched through the
/// clickstream links API instead.
pub async fn download(
    client: &ExportClient,
    fetcher: &ArchiveFetcher,
    job: &ExportJob,
    dest: &Path,
) -> Result<Vec<std::path::PathBuf>> {
    match check_downloadable(job) {
        Ok(()) => {
            let path = fetcher
                .download(job, dest)
                .await
                .with_context(|| format!("Failed to download export job {}", job.id))?;
            Ok(vec![path])
        }
        Err(DownloadError::UnsupportedExportKind { .. }) => {
            let request = ClickstreamLinksRequest::new(job.request.scope.clone(), job.request.interval)?;
            let links = client
                .clickstream_download_links(&request)
                .await
                .context("Failed to get clickstream download links")?;
            log::info!("Downloading {} clickstream files for {}", links.len(), job.id);
            fetcher
                .download_links(&job.id, &links, dest)
                .await
                .with_context(|| format!("Failed to download clickstream export {}", job.id))
        }
        Err(e) => Err(e.into()),
    }
}

async fn job_details(client: &ExportClient, job: &ExportJob) -> Table {
    let scope_name = match client.scope_name(&job.request.scope).await {
        Ok(name) => name,
        Err(e) => {
            log::warn!("Could not look up scope name: {}", e);
            "Unknown".to_string()
        }
    };

    let mut fields = vec![
        ("Export Job Id", job.id.clone()),
        ("Export Type", job.kind().to_string()),
        ("Status", job.status.to_string()),
        ("Scope Context", job.request.scope.context().to_string()),
        ("Scope Id", job.request.scope.id()),
        ("Scope Name", scope_name),
        ("User Id Hashing", job.request.anonymity_display().to_string()),
        ("Created", format_created(job)),
    ];
    if let Some(schemas) = job.request.schema_names_display() {
        fields.push(("Schemas", schemas));
    }
    if let Some(link) = job.download_link() {
        fields.push(("Download Link", link.to_string()));
    }
    if let Some(interval) = &job.request.interval {
        fields.push(("Interval", format!("{} - {}", interval.start, interval.end)));
    }
    detail_table(fields)
}

fn jobs_table(jobs: &[ExportJob]) -> Table {
    let mut table = Table::new([
        "Created",
        "Request Id",
        "Status",
        "Type",
        "User Id Hashing",
        "Scope",
        "Schemas",
    ]);
    for job in jobs {
        table.push([
            format_created(job),
            job.id.clone(),
            job.status.to_string(),
            job.kind().to_string(),
            job.request.anonymity_display().to_string(),
            format!("{} {}", job.request.scope.context(), job.request.scope.id()),
            job.request.schema_names_display().unwrap_or_default(),
        ]);
    }
    table
}

fn format_created(job: &ExportJob) -> String {
    match job.metadata.as_ref().and_then(|m| m.created_at) {
        Some(created) => created.format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown".to_string(),
    }
}

/// Whether `containers create` can load this job into a database.
pub fn is_loadable(job: &ExportJob) -> bool {
    job.kind() == ExportKind::Tables
}
