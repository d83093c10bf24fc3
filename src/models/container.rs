use std::fmt;

use chrono::{DateTime, Utc};

/// Lifecycle state reported by the container runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Stopped,
    /// Any other runtime state (paused, restarting, dead, ...).
    Other(String),
}

impl ContainerStatus {
    /// Maps the runtime's state string. `exited` is reported as stopped.
    pub fn from_runtime(state: &str) -> Self {
        match state {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "exited" | "stopped" => ContainerStatus::Stopped,
            other => ContainerStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Created => f.write_str("created"),
            ContainerStatus::Running => f.write_str("running"),
            ContainerStatus::Stopped => f.write_str("stopped"),
            ContainerStatus::Other(state) => f.write_str(state),
        }
    }
}

/// A database container created by this tool, as seen by one inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub host_port: u16,
    /// Only published while the container is running.
    pub host_ip: Option<String>,
    pub created: DateTime<Utc>,
    pub status: ContainerStatus,
    pub database_name: String,
}

impl ContainerRecord {
    /// The 12 character id prefix the docker CLI shows.
    pub fn short_id(&self) -> &str {
        let end = self.id.len().min(12);
        &self.id[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ContainerStatus::from_runtime("exited"), ContainerStatus::Stopped);
        assert_eq!(ContainerStatus::from_runtime("running"), ContainerStatus::Running);
        assert_eq!(
            ContainerStatus::from_runtime("paused").to_string(),
            "paused"
        );
    }

    #[test]
    fn test_short_id() {
        let record = ContainerRecord {
            id: "0123456789abcdef".to_string(),
            name: "ml".to_string(),
            host_port: 5433,
            host_ip: Some("0.0.0.0".to_string()),
            created: DateTime::<Utc>::UNIX_EPOCH,
            status: ContainerStatus::Running,
            database_name: "ml".to_string(),
        };
        assert_eq!(record.short_id(), "0123456789ab");
    }
}
