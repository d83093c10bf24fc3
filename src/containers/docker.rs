//! [`ContainerRuntime`] backed by a docker daemon through `bollard`.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    UploadToContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, HostConfig, PortBinding, PortMap};
use bollard::Docker;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;

use super::runtime::{ContainerDetails, ContainerRuntime, ContainerSpec};
use crate::config::POSTGRES_CONTAINER_PORT;
use crate::error_handling::ContainerError;
use crate::models::ContainerStatus;

/// Docker daemon client.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

fn status_code(err: &BollardError) -> Option<u16> {
    match err {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

fn not_found_or(container: &str, err: BollardError) -> ContainerError {
    if status_code(&err) == Some(404) {
        ContainerError::NotFound(container.to_string())
    } else {
        ContainerError::Runtime(err)
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn image_exists(&self, image: &str) -> Result<bool, ContainerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if status_code(&e) == Some(404) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<(), ContainerError> {
        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };
        let progress: Vec<_> = self
            .docker
            .create_image(Some(options), None, None)
            .try_collect()
            .await?;
        log::debug!("Pulled {} ({} progress events)", image, progress.len());
        Ok(())
    }

    async fn list_labeled(&self, label: &str) -> Result<Vec<String>, ContainerError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![label.to_string()]);
        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        Ok(containers.into_iter().filter_map(|c| c.id).collect())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let mut port_bindings: PortMap = HashMap::new();
        port_bindings.insert(
            spec.container_port.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(spec.host_port.to_string()),
            }]),
        );
        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(spec.container_port.clone(), HashMap::new());

        let config = Config {
            image: Some(spec.image.clone()),
            labels: Some(spec.labels.clone()),
            env: Some(spec.env.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(HostConfig {
                binds: Some(spec.binds.clone()),
                port_bindings: Some(port_bindings),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self.docker.create_container(Some(options), config).await?;
        for warning in &response.warnings {
            log::warn!("Docker: {}", warning);
        }
        Ok(response.id)
    }

    async fn upload_archive(
        &self,
        container: &str,
        path: &str,
        tar: Vec<u8>,
    ) -> Result<(), ContainerError> {
        let options = UploadToContainerOptions {
            path: path.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(container, Some(options), tar.into())
            .await
            .map_err(|e| not_found_or(container, e))
    }

    async fn start(&self, container: &str) -> Result<(), ContainerError> {
        match self
            .docker
            .start_container(container, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            // 304: already started
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(not_found_or(container, e)),
        }
    }

    async fn stop(&self, container: &str) -> Result<(), ContainerError> {
        match self
            .docker
            .stop_container(container, None::<StopContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if status_code(&e) == Some(304) => Ok(()),
            Err(e) => Err(not_found_or(container, e)),
        }
    }

    async fn remove(&self, container: &str) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions {
            force: false,
            ..Default::default()
        };
        match self.docker.remove_container(container, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if status_code(&e) == Some(409) => {
                Err(ContainerError::Busy(container.to_string()))
            }
            Err(e) => Err(not_found_or(container, e)),
        }
    }

    async fn inspect(&self, container: &str) -> Result<ContainerDetails, ContainerError> {
        let response = self
            .docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(|e| not_found_or(container, e))?;
        Ok(details_from_inspect(response))
    }

    async fn logs_tail(&self, container: &str, lines: usize) -> Result<Vec<String>, ContainerError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: lines.to_string(),
            ..Default::default()
        };
        let chunks: Vec<_> = self
            .docker
            .logs(container, Some(options))
            .try_collect()
            .await
            .map_err(|e| not_found_or(container, e))?;

        Ok(chunks
            .iter()
            .flat_map(|chunk| {
                chunk
                    .to_string()
                    .lines()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect())
    }
}

fn first_binding(ports: Option<&PortMap>) -> Option<&PortBinding> {
    ports?
        .get(POSTGRES_CONTAINER_PORT)?
        .as_ref()?
        .first()
}

fn details_from_inspect(response: ContainerInspectResponse) -> ContainerDetails {
    let name = response
        .name
        .as_deref()
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_default();

    let state = response.state.as_ref();
    let running = state.and_then(|s| s.running).unwrap_or(false);
    let status = state
        .and_then(|s| s.status.as_ref())
        .map(|s| ContainerStatus::from_runtime(&s.to_string()))
        .unwrap_or(ContainerStatus::Other("unknown".to_string()));

    let configured = response
        .host_config
        .as_ref()
        .and_then(|hc| first_binding(hc.port_bindings.as_ref()));
    let published = response
        .network_settings
        .as_ref()
        .and_then(|ns| first_binding(ns.ports.as_ref()));

    let host_port = configured
        .or(published)
        .and_then(|b| b.host_port.as_deref())
        .and_then(|p| p.parse().ok());
    let host_ip = published.and_then(|b| b.host_ip.clone());

    let created = response
        .created
        .as_deref()
        .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
        .map(|c| c.with_timezone(&Utc));

    let labels = response
        .config
        .and_then(|c| c.labels)
        .unwrap_or_default();

    ContainerDetails {
        id: response.id.unwrap_or_default(),
        name,
        created,
        status,
        running,
        labels,
        host_port,
        host_ip,
    }
}
