//! The container runtime seam.
//!
//! [`ContainerRuntime`] is the narrow set of daemon operations provisioning
//! needs. [`super::DockerRuntime`] implements it against a docker daemon;
//! tests use an in-memory fake.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DATABASE_NAME_LABEL;
use crate::error_handling::ContainerError;
use crate::models::{ContainerRecord, ContainerStatus};

/// Everything needed to create a database container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    /// `host_path:container_path[:mode]` bind mounts
    pub binds: Vec<String>,
    /// Container side of the published port, e.g. `5432/tcp`
    pub container_port: String,
    pub host_port: u16,
}

/// The subset of an inspection result this tool relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    pub created: Option<DateTime<Utc>>,
    pub status: ContainerStatus,
    pub running: bool,
    pub labels: HashMap<String, String>,
    /// Host port configured at creation time.
    pub host_port: Option<u16>,
    /// Host address, present only while the port is published.
    pub host_ip: Option<String>,
}

impl ContainerDetails {
    /// Converts to a [`ContainerRecord`], requiring the database label and a port.
    pub fn into_record(self) -> Result<ContainerRecord, ContainerError> {
        let host_port = self.host_port.ok_or_else(|| ContainerError::Malformed {
            container: self.name.clone(),
            what: "a published postgres port",
        })?;
        let database_name = self
            .labels
            .get(DATABASE_NAME_LABEL)
            .cloned()
            .ok_or_else(|| ContainerError::Malformed {
                container: self.name.clone(),
                what: "the database_name label",
            })?;

        Ok(ContainerRecord {
            id: self.id,
            name: self.name,
            host_port,
            host_ip: self.host_ip,
            created: self.created.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            status: self.status,
            database_name,
        })
    }
}

/// Operations on the container daemon.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError>;

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError>;

    /// Ids of all containers, running or not, carrying `label`.
    async fn list_labeled(&self, label: &str) -> Result<Vec<String>, ContainerError>;

    /// Creates the container and returns its id.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    /// Unpacks a tar archive at `path` inside the container.
    async fn upload_archive(
        &self,
        container: &str,
        path: &str,
        tar: Vec<u8>,
    ) -> Result<(), ContainerError>;

    async fn start(&self, container: &str) -> Result<(), ContainerError>;

    /// Stopping an already stopped container succeeds.
    async fn stop(&self, container: &str) -> Result<(), ContainerError>;

    /// Removal is never forced.
    async fn remove(&self, container: &str) -> Result<(), ContainerError>;

    /// Fails with [`ContainerError::NotFound`] for unknown containers.
    async fn inspect(&self, container: &str) -> Result<ContainerDetails, ContainerError>;

    /// The last `lines` lines of combined stdout/stderr.
    async fn logs_tail(&self, container: &str, lines: usize) -> Result<Vec<String>, ContainerError>;

    async fn find(&self, container: &str) -> Result<Option<ContainerDetails>, ContainerError> {
        match self.inspect(container).await {
            Ok(details) => Ok(Some(details)),
            Err(ContainerError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
