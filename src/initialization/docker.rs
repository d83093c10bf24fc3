//! Docker daemon connection.

use std::time::Duration;

use bollard::{Docker, API_DEFAULT_VERSION};

use crate::config::DockerOptions;
use crate::containers::DockerRuntime;
use crate::error_handling::InitializationError;

/// Connects to the docker daemon named by `--docker-url`/`DOCKER_HOST`, or the
/// platform default socket when neither is set.
///
/// `unix://` URLs use the socket transport, `tcp://` and `http://` URLs use
/// plain HTTP. Bollard does not contact the daemon until the first call, so a
/// daemon that is down surfaces on the first container operation.
pub fn init_docker(options: &DockerOptions) -> Result<DockerRuntime, InitializationError> {
    let timeout = options.timeout;
    let docker = match options.docker_url.as_deref() {
        Some(url) if url.starts_with("unix://") => {
            Docker::connect_with_socket(url, timeout, API_DEFAULT_VERSION)?
        }
        Some(url) if url.starts_with("tcp://") || url.starts_with("http://") => {
            Docker::connect_with_http(url, timeout, API_DEFAULT_VERSION)?
        }
        Some(url) => {
            log::warn!(
                "Unsupported docker url scheme in {}, using local defaults",
                url
            );
            Docker::connect_with_local_defaults()?.with_timeout(Duration::from_secs(timeout))
        }
        None => Docker::connect_with_local_defaults()?.with_timeout(Duration::from_secs(timeout)),
    };
    log::debug!("Docker client configured (timeout {}s)", timeout);
    Ok(DockerRuntime::new(docker))
}
