//! Docker container runtime adapter.

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::Docker;
use tracing::debug;
use watchdog::prober::ContainerRuntime;
use watchdog::types::ProbeFailure;

/// Container runtime backed by the local Docker daemon.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using the standard local defaults (unix socket or
    /// environment overrides). Fails at startup when the daemon is
    /// unreachable and container probes are configured.
    pub fn connect() -> common::Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| common::Error::probe(format!("failed to create docker client: {}", e)))?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn is_running(&self, name: &str) -> Result<bool, ProbeFailure> {
        // all: true so a stopped container is reported as not running
        // rather than simply absent
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ProbeFailure::Runtime(e.to_string()))?;

        // Docker reports names with a leading slash
        let wanted = format!("/{}", name);
        let running = containers.iter().any(|c| {
            let matched = c
                .names
                .as_ref()
                .map(|names| names.iter().any(|n| n == &wanted || n == name))
                .unwrap_or(false);
            matched && c.state.as_deref() == Some("running")
        });

        debug!(container = name, running, "container state checked");
        Ok(running)
    }
}
