//! Database container provisioning.
//!
//! A container moves through these states:
//!
//! ```text
//! absent --create_from_folder--> created --initialize/start--> initializing
//! initializing --marker seen--> ready
//! initializing --process exited / attempts exhausted--> failed
//! ready --stop--> stopped --start--> initializing
//! stopped --remove--> removed
//! ```
//!
//! Readiness is detected by scraping the tail of the container log for the
//! postgres startup messages. Every poll also re-checks that the container
//! process is still running, so a crashed init script fails fast instead of
//! burning the whole attempt budget.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::init_script::init_script_archive;
use super::runtime::{ContainerRuntime, ContainerSpec};
use crate::config::{
    DATABASE_NAME_LABEL, DEFAULT_HOST_PORT, DOCKER_LABEL, EXPORT_DATA_MOUNT, INIT_LOG_TAIL,
    INIT_SCRIPT_DIR, POLL_INTERVAL, POLL_MAX_ATTEMPTS, POSTGRES_CONTAINER_PORT,
    POSTGRES_DOCKER_IMAGE, POSTGRES_INIT_MSG, POSTGRES_READY_MSG, READY_LOG_TAIL,
};
use crate::error_handling::{ContainerError, StartupFailure};
use crate::models::ContainerRecord;

/// Bounded polling budget for readiness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_attempts: POLL_MAX_ATTEMPTS,
        }
    }
}

/// Host port for a new container: one past the highest port in use, or 5433.
pub fn next_available_port(ports_in_use: &[u16]) -> u16 {
    ports_in_use
        .iter()
        .max()
        .map(|p| p.saturating_add(1))
        .unwrap_or(DEFAULT_HOST_PORT)
}

/// Log marker a readiness wait looks for.
struct Marker {
    phase: &'static str,
    message: &'static str,
    tail: usize,
}

const READY: Marker = Marker {
    phase: "start",
    message: POSTGRES_READY_MSG,
    tail: READY_LOG_TAIL,
};

const INITIALIZED: Marker = Marker {
    phase: "initialize",
    message: POSTGRES_INIT_MSG,
    tail: INIT_LOG_TAIL,
};

/// Creates, boots and tears down export database containers.
pub struct ContainerProvisioner<R> {
    runtime: R,
    poll: PollPolicy,
}

impl<R: ContainerRuntime> ContainerProvisioner<R> {
    pub fn new(runtime: R, poll: PollPolicy) -> Self {
        Self { runtime, poll }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Creates a stopped postgres container that loads `folder` on first start.
    ///
    /// An existing container with the same name is stopped and removed first.
    pub async fn create_from_folder(
        &self,
        folder: &Path,
        container_name: &str,
        database_name: &str,
    ) -> Result<String, ContainerError> {
        log::debug!("Creating container from {}", folder.display());
        let folder = std::path::absolute(folder).map_err(|source| ContainerError::DataFolder {
            folder: folder.display().to_string(),
            source,
        })?;

        if !self.runtime.image_exists(POSTGRES_DOCKER_IMAGE).await? {
            log::info!("Downloading image: {}", POSTGRES_DOCKER_IMAGE);
            self.runtime.pull_image(POSTGRES_DOCKER_IMAGE).await?;
        }

        if let Some(existing) = self.runtime.find(container_name).await? {
            log::info!("Removing existing container with name: {}", container_name);
            self.runtime.stop(&existing.id).await?;
            self.runtime.remove(&existing.id).await?;
        }

        let ports: Vec<u16> = self
            .list_all()
            .await?
            .iter()
            .map(|record| record.host_port)
            .collect();
        let host_port = next_available_port(&ports);

        let mut labels = HashMap::new();
        labels.insert(DOCKER_LABEL.to_string(), String::new());
        labels.insert(DATABASE_NAME_LABEL.to_string(), database_name.to_string());

        let spec = ContainerSpec {
            name: container_name.to_string(),
            image: POSTGRES_DOCKER_IMAGE.to_string(),
            labels,
            env: vec!["POSTGRES_HOST_AUTH_METHOD=trust".to_string()],
            binds: vec![format!("{}:{}:ro", folder.display(), EXPORT_DATA_MOUNT)],
            container_port: POSTGRES_CONTAINER_PORT.to_string(),
            host_port,
        };
        let id = self.runtime.create(&spec).await?;

        self.runtime
            .upload_archive(&id, INIT_SCRIPT_DIR, init_script_archive(database_name)?)
            .await?;

        log::info!("Created container with id: {} (port {})", id, host_port);
        Ok(id)
    }

    /// First boot: starts the container and waits for the init scripts to finish.
    pub async fn initialize(&self, container: &str) -> Result<(), ContainerError> {
        log::info!("Initializing container {}...", container);
        self.runtime.start(container).await?;
        self.wait_for(container, &INITIALIZED).await?;
        log::info!("Initialized container {}.", container);
        Ok(())
    }

    /// Starts a created or stopped container and waits until postgres accepts connections.
    pub async fn start(&self, container: &str) -> Result<(), ContainerError> {
        log::debug!("Starting container {}...", container);
        self.runtime.start(container).await?;
        self.wait_until_ready(container).await?;
        log::info!("Started container {}.", container);
        Ok(())
    }

    /// Waits for the ready marker without starting the container.
    pub async fn wait_until_ready(&self, container: &str) -> Result<(), ContainerError> {
        self.wait_for(container, &READY).await
    }

    /// Full provisioning: create, run the init scripts, wait for the final restart.
    pub async fn provision(
        &self,
        folder: &Path,
        container_name: &str,
        database_name: &str,
    ) -> Result<String, ContainerError> {
        let id = self
            .create_from_folder(folder, container_name, database_name)
            .await?;
        self.initialize(&id).await?;
        self.wait_until_ready(&id).await?;
        Ok(id)
    }

    pub async fn stop(&self, container: &str) -> Result<(), ContainerError> {
        self.runtime.stop(container).await?;
        log::info!("Stopped container {}.", container);
        Ok(())
    }

    /// Removes a stopped container. Running containers are refused.
    pub async fn remove(&self, container: &str) -> Result<(), ContainerError> {
        let details = self.runtime.inspect(container).await?;
        if details.running {
            return Err(ContainerError::Busy(container.to_string()));
        }
        self.runtime.remove(container).await?;
        log::info!("Removed container {}.", container);
        Ok(())
    }

    /// Inspects one container created by this tool.
    pub async fn describe(&self, container: &str) -> Result<ContainerRecord, ContainerError> {
        self.runtime.inspect(container).await?.into_record()
    }

    /// Every container carrying the ownership label.
    pub async fn list_all(&self) -> Result<Vec<ContainerRecord>, ContainerError> {
        let ids = self.runtime.list_labeled(DOCKER_LABEL).await?;
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.runtime.inspect(&id).await?.into_record() {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping container {}: {}", id, e),
            }
        }
        Ok(records)
    }

    async fn wait_for(&self, container: &str, marker: &Marker) -> Result<(), ContainerError> {
        for attempt in 1..=self.poll.max_attempts {
            let lines = self.runtime.logs_tail(container, marker.tail).await?;
            if lines.iter().any(|line| line.contains(marker.message)) {
                return Ok(());
            }

            if !self.runtime.inspect(container).await?.running {
                return Err(self
                    .startup_failure(container, marker, StartupFailure::ProcessExited)
                    .await);
            }

            log::debug!(
                "Waiting for container {} to {} (attempt {}/{})",
                container,
                marker.phase,
                attempt,
                self.poll.max_attempts
            );
            if attempt < self.poll.max_attempts {
                tokio::time::sleep(self.poll.interval).await;
            }
        }

        Err(self
            .startup_failure(
                container,
                marker,
                StartupFailure::AttemptsExhausted(self.poll.max_attempts),
            )
            .await)
    }

    async fn startup_failure(
        &self,
        container: &str,
        marker: &Marker,
        reason: StartupFailure,
    ) -> ContainerError {
        let log_tail = match self.runtime.logs_tail(container, INIT_LOG_TAIL).await {
            Ok(lines) => lines.join("\n"),
            Err(e) => format!("<logs unavailable: {e}>"),
        };
        log::error!(
            "Container {} failed to {}, check log for errors:\n{}",
            container,
            marker.phase,
            log_tail
        );
        ContainerError::StartupTimeout {
            container: container.to_string(),
            phase: marker.phase,
            reason,
            log_tail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_available_port() {
        assert_eq!(next_available_port(&[5433, 5434, 5440]), 5441);
        assert_eq!(next_available_port(&[]), 5433);
        assert_eq!(next_available_port(&[6000]), 6001);
    }

    #[test]
    fn test_default_poll_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(policy.max_attempts, 60);
    }
}
