//! Probe implementations.

use crate::types::{Outcome, ProbeFailure};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Performs one health check against one service.
///
/// Probers never retry internally; the fixed polling interval acts as
/// natural backoff.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Perform a single probe.
    async fn probe(&self) -> Outcome;

    /// Probe kind, used in logs.
    fn kind(&self) -> &str;
}

/// Container runtime capability consumed by [`ContainerProber`].
///
/// The actual Docker client lives in the server crate; tests substitute
/// a fake.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether a container with the given name exists and is running.
    async fn is_running(&self, name: &str) -> Result<bool, ProbeFailure>;
}

/// HTTP GET probe.
pub struct HttpProber {
    url: String,
    accept_status: Option<u16>,
    timeout_duration: Duration,
    client: reqwest::Client,
}

impl HttpProber {
    /// Create a new HTTP prober sharing the given client.
    pub fn new(
        url: String,
        accept_status: Option<u16>,
        timeout_duration: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            url,
            accept_status,
            timeout_duration,
            client,
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self) -> Outcome {
        match timeout(self.timeout_duration, self.client.get(&self.url).send()).await {
            Ok(Ok(response)) => {
                let status = response.status();
                let code = status.as_u16();

                if status.is_success() || self.accept_status == Some(code) {
                    debug!(url = %self.url, status = code, "HTTP probe up");
                    Outcome::Up
                } else {
                    warn!(url = %self.url, status = code, "HTTP probe reported unhealthy");
                    Outcome::Down(format!("unexpected status code: {}", code))
                }
            }
            Ok(Err(e)) if e.is_timeout() => {
                warn!(url = %self.url, "HTTP probe timed out");
                Outcome::ProbeError(ProbeFailure::Timeout)
            }
            Ok(Err(e)) => {
                warn!(url = %self.url, error = %e, "HTTP probe failed");
                Outcome::ProbeError(ProbeFailure::Transport(e.to_string()))
            }
            Err(_) => {
                warn!(url = %self.url, "HTTP probe timed out");
                Outcome::ProbeError(ProbeFailure::Timeout)
            }
        }
    }

    fn kind(&self) -> &str {
        "http"
    }
}

/// Container-state probe.
pub struct ContainerProber {
    container: String,
    runtime: Arc<dyn ContainerRuntime>,
    timeout_duration: Duration,
}

impl ContainerProber {
    /// Create a new container-state prober.
    pub fn new(
        container: String,
        runtime: Arc<dyn ContainerRuntime>,
        timeout_duration: Duration,
    ) -> Self {
        Self {
            container,
            runtime,
            timeout_duration,
        }
    }
}

#[async_trait]
impl Prober for ContainerProber {
    async fn probe(&self) -> Outcome {
        match timeout(
            self.timeout_duration,
            self.runtime.is_running(&self.container),
        )
        .await
        {
            Ok(Ok(true)) => {
                debug!(container = %self.container, "container is running");
                Outcome::Up
            }
            Ok(Ok(false)) => {
                warn!(container = %self.container, "container is not running");
                Outcome::Down("container not running".to_string())
            }
            Ok(Err(e)) => {
                warn!(container = %self.container, error = %e, "container probe failed");
                Outcome::ProbeError(e)
            }
            Err(_) => {
                warn!(container = %self.container, "container probe timed out");
                Outcome::ProbeError(ProbeFailure::Timeout)
            }
        }
    }

    fn kind(&self) -> &str {
        "container"
    }
}
