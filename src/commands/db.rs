//! `db` subcommands: inspect and export data from a container's database.

use anyhow::{bail, Context, Result};

use crate::config::{CreateViewArgs, DbCommand, POSTGRES_DOCKER_IMAGE, POSTGRES_USER};
use crate::containers::{ContainerProvisioner, ContainerRuntime};
use crate::db::{packaged_view, view_name_from_file, RelationAccessor};

pub async fn run<R: ContainerRuntime>(
    provisioner: &ContainerProvisioner<R>,
    command: DbCommand,
) -> Result<()> {
    match command {
        DbCommand::ListTables { container_name } => {
            let accessor = connect(provisioner, &container_name).await?;
            for table in accessor.list_tables().await? {
                println!("{table}");
            }
        }
        DbCommand::ListViews { container_name } => {
            let accessor = connect(provisioner, &container_name).await?;
            for view in accessor.list_views().await? {
                println!("{view}");
            }
        }
        DbCommand::CreateView(args) => create_view(provisioner, args).await?,
        DbCommand::UnloadToCsv {
            container_name,
            dest,
            relation,
        } => {
            let accessor = connect(provisioner, &container_name).await?;
            let (path, rows) = accessor
                .unload_to_folder(&relation, &dest)
                .await
                .with_context(|| format!("Failed to unload {relation}"))?;
            log::info!("Unloaded {} rows of {} to {}", rows, relation, path.display());
            println!("{}", path.display());
        }
        DbCommand::Connect { container_name } => {
            connect_shell(provisioner, &container_name).await?
        }
    }
    Ok(())
}

async fn connect<R: ContainerRuntime>(
    provisioner: &ContainerProvisioner<R>,
    container_name: &str,
) -> Result<RelationAccessor> {
    let record = provisioner
        .describe(container_name)
        .await
        .with_context(|| format!("Failed to inspect container {container_name}"))?;
    RelationAccessor::for_container(&record)
        .await
        .with_context(|| format!("Failed to connect to the database in {container_name}"))
}

async fn create_view<R: ContainerRuntime>(
    provisioner: &ContainerProvisioner<R>,
    args: CreateViewArgs,
) -> Result<()> {
    let (name, template) = match (args.source.view_name, args.source.sql_file) {
        (Some(name), _) => {
            let view = packaged_view(&name)?;
            (view.name.to_string(), view.sql.to_string())
        }
        (None, Some(path)) => {
            let name = view_name_from_file(&path)?;
            let sql = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            (name, sql)
        }
        (None, None) => bail!("Either --view-name or --sql-file is required"),
    };

    let accessor = connect(provisioner, &args.container_name).await?;
    accessor
        .create_view_from_template(&name, &template, args.partner_short_name)
        .await
        .with_context(|| format!("Failed to create view {name}"))?;
    log::info!("Created view {} in {}", name, args.container_name);
    Ok(())
}

/// Runs an interactive `psql` in a throwaway container linked to the database
/// container.
async fn connect_shell<R: ContainerRuntime>(
    provisioner: &ContainerProvisioner<R>,
    container_name: &str,
) -> Result<()> {
    let record = provisioner
        .describe(container_name)
        .await
        .with_context(|| format!("Failed to inspect container {container_name}"))?;

    let status = tokio::process::Command::new("docker")
        .args(psql_args(&record.name, &record.database_name))
        .status()
        .await
        .context("Failed to run docker; is the docker CLI installed?")?;
    if !status.success() {
        bail!("psql exited with {status}");
    }
    Ok(())
}

fn psql_args(container_name: &str, database_name: &str) -> Vec<String> {
    [
        "run",
        "-it",
        "--rm",
        "--link",
        container_name,
        POSTGRES_DOCKER_IMAGE,
        "psql",
        "-h",
        container_name,
        "-d",
        database_name,
        "-U",
        POSTGRES_USER,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psql_args() {
        assert_eq!(
            psql_args("ml", "machine-learning").join(" "),
            "run -it --rm --link ml postgres:9.5 psql -h ml -d machine-learning -U postgres"
        );
    }
}
