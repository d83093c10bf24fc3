//! Relation introspection, view creation and CSV unloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use csv::Writer;
use futures::TryStreamExt;
use log::{error, info};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::config::POSTGRES_USER;
use crate::error_handling::DatabaseError;
use crate::models::{ContainerRecord, ContainerStatus, RelationDescriptor, RelationKind};

/// Rejects anything that is not a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
pub fn validate_identifier(name: &str) -> Result<&str, DatabaseError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Connection URL for the database inside a running export container.
pub fn connection_url(record: &ContainerRecord) -> Result<String, DatabaseError> {
    if record.status != ContainerStatus::Running {
        return Err(DatabaseError::ContainerNotRunning(record.name.clone()));
    }
    let host = match record.host_ip.as_deref() {
        None | Some("") | Some("0.0.0.0") | Some("::") => "127.0.0.1",
        Some(ip) => ip,
    };
    Ok(format!(
        "postgres://{}@{}:{}/{}",
        POSTGRES_USER, host, record.host_port, record.database_name
    ))
}

/// Maps an `information_schema.tables.table_type` value to a relation kind.
/// Foreign tables and other types are not listed.
fn relation_kind(table_type: &str) -> Option<RelationKind> {
    match table_type {
        "BASE TABLE" => Some(RelationKind::Table),
        "VIEW" => Some(RelationKind::View),
        _ => None,
    }
}

/// The batch that replaces view `name` with `sql`. A trailing `;` on `sql` is dropped.
fn view_statement(name: &str, sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("DROP VIEW IF EXISTS \"{name}\";\nCREATE VIEW \"{name}\" AS {body};")
}

/// Access to the tables and views of one export database.
pub struct RelationAccessor {
    pool: PgPool,
}

impl RelationAccessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {e}");
                DatabaseError::SqlError(e)
            })?;
        Ok(Self::new(pool))
    }

    pub async fn for_container(record: &ContainerRecord) -> Result<Self, DatabaseError> {
        Self::connect(&connection_url(record)?).await
    }

    /// Every table and view in the public schema, ordered by name.
    pub async fn relations(&self) -> Result<Vec<RelationDescriptor>, DatabaseError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT table_name::text, table_type::text FROM information_schema.tables \
             WHERE table_schema = 'public' \
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(name, table_type)| {
                relation_kind(&table_type).map(|kind| RelationDescriptor { name, kind })
            })
            .collect())
    }

    async fn relation_names(&self, kind: RelationKind) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .relations()
            .await?
            .into_iter()
            .filter(|relation| relation.kind == kind)
            .map(|relation| relation.name)
            .collect())
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        self.relation_names(RelationKind::Table).await
    }

    pub async fn list_views(&self) -> Result<Vec<String>, DatabaseError> {
        self.relation_names(RelationKind::View).await
    }

    /// Column names of a relation, in ordinal order.
    pub async fn columns(&self, relation: &str) -> Result<Vec<String>, DatabaseError> {
        let columns = sqlx::query_scalar::<_, String>(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(relation)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    /// Replaces `name` with a view over `sql`. Running it twice is harmless.
    pub async fn create_view(&self, name: &str, sql: &str) -> Result<(), DatabaseError> {
        let name = validate_identifier(name)?;
        let statement = view_statement(name, sql);
        sqlx::raw_sql(&statement).execute(&self.pool).await?;
        info!("Created view {}", name);
        Ok(())
    }

    /// Writes every row of `relation` to `dest` as CSV with a header row and
    /// returns the number of data rows. NULL becomes an empty field.
    pub async fn unload_relation(&self, relation: &str, dest: &Path) -> Result<u64, DatabaseError> {
        let relation = validate_identifier(relation)?;
        let columns = self.columns(relation).await?;
        if columns.is_empty() {
            return Err(DatabaseError::RelationNotFound(relation.to_string()));
        }

        let select_list = columns
            .iter()
            .map(|c| format!("\"{}\"::text", c.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!("SELECT {select_list} FROM \"{relation}\"");

        let mut writer = Writer::from_path(dest)?;
        writer.write_record(&columns)?;

        let mut rows = sqlx::query(&query).fetch(&self.pool);
        let mut count: u64 = 0;
        while let Some(row) = rows.try_next().await? {
            let mut record = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: Option<String> = row.try_get(i)?;
                record.push(value.unwrap_or_default());
            }
            writer.write_record(&record)?;
            count += 1;
        }
        writer.flush()?;

        Ok(count)
    }

    /// Unloads `relation` to `<dest_dir>/<relation>.csv`, creating `dest_dir`.
    pub async fn unload_to_folder(
        &self,
        relation: &str,
        dest_dir: &Path,
    ) -> Result<(PathBuf, u64), DatabaseError> {
        let relation = validate_identifier(relation)?;
        if !dest_dir.exists() {
            log::debug!("Creating destination folder: {}", dest_dir.display());
            tokio::fs::create_dir_all(dest_dir).await?;
        }
        let path = dest_dir.join(format!("{relation}.csv"));
        let rows = self.unload_relation(relation, &path).await?;
        Ok((path, rows))
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
