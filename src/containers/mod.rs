//! Postgres containers holding export data.
//!
//! - [`ContainerRuntime`]: the daemon operations provisioning relies on
//! - [`DockerRuntime`]: the docker implementation (via `bollard`)
//! - [`ContainerProvisioner`]: create, initialize, start, stop, remove, list

mod docker;
mod init_script;
mod provisioner;
mod runtime;

pub use docker::DockerRuntime;
pub use init_script::{init_script, init_script_archive};
pub use provisioner::{next_available_port, ContainerProvisioner, PollPolicy};
pub use runtime::{ContainerDetails, ContainerRuntime, ContainerSpec};
