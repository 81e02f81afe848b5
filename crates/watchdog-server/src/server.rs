//! Top-level server wiring.

use crate::alertmanager::AlertmanagerClient;
use crate::config::Config;
use crate::dispatcher::{AlertSink, Dispatcher, LogSink};
use crate::http_server::HttpServer;
use crate::loki::LokiClient;
use crate::metrics::MetricsRegistry;
use crate::runtime::DockerRuntime;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watchdog::prober::{ContainerProber, ContainerRuntime, HttpProber, Prober};
use watchdog::types::ProbeTarget;
use watchdog::{HealthStore, Reconciler, RecoveryPolicy, Scheduler};

/// Watchdog server: builds the core engine from configuration and runs
/// it alongside the HTTP surface until shutdown.
pub struct WatchdogServer {
    config: Config,
}

impl WatchdogServer {
    /// Create a new watchdog server.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server until SIGINT/SIGTERM.
    pub async fn run(self) -> common::Result<()> {
        info!("starting watchdog server");

        let store = Arc::new(HealthStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let shutdown = CancellationToken::new();

        // Failure to construct probing clients is fatal at startup
        let http_client = reqwest::Client::builder()
            .timeout(self.config.watchdog.probe_timeout)
            .build()
            .map_err(|e| common::Error::probe(format!("failed to create HTTP client: {}", e)))?;

        let runtime: Option<Arc<dyn ContainerRuntime>> = if self.config.needs_container_runtime() {
            Some(Arc::new(DockerRuntime::connect()?))
        } else {
            None
        };

        let probe_timeout = self.config.watchdog.probe_timeout;
        let mut services: Vec<(watchdog::ServiceSpec, Arc<dyn Prober>)> = Vec::new();
        for spec in &self.config.services {
            let prober: Arc<dyn Prober> = match &spec.probe {
                ProbeTarget::Http { url, accept_status } => Arc::new(HttpProber::new(
                    url.clone(),
                    *accept_status,
                    probe_timeout,
                    http_client.clone(),
                )),
                ProbeTarget::Container { container } => {
                    // needs_container_runtime guarantees presence for
                    // enabled container specs; disabled ones never probe
                    let Some(runtime) = runtime.clone() else {
                        continue;
                    };
                    Arc::new(ContainerProber::new(
                        container.clone(),
                        runtime,
                        probe_timeout,
                    ))
                }
            };
            services.push((spec.clone(), prober));
        }
        info!(services = services.len(), "service registry built");

        let alerts: Option<Arc<dyn AlertSink>> = match &self.config.alerting.alertmanager_url {
            Some(url) => {
                info!(url = %url, "alert forwarding enabled");
                Some(Arc::new(
                    AlertmanagerClient::new(url.clone())
                        .map_err(|e| common::Error::sink(e.to_string()))?,
                ))
            }
            None => None,
        };
        let logs: Option<Arc<dyn LogSink>> = match &self.config.alerting.loki_url {
            Some(url) => {
                info!(url = %url, "log forwarding enabled");
                Some(Arc::new(
                    LokiClient::new(url.clone(), self.config.alerting.job.clone())
                        .map_err(|e| common::Error::sink(e.to_string()))?,
                ))
            }
            None => None,
        };

        let dispatcher = Arc::new(Dispatcher::new(
            metrics.clone(),
            alerts,
            logs,
            self.config.alerting.severity.clone(),
            self.config.alerting.job.clone(),
        ));

        let reconciler = Reconciler::new(services, store.clone(), probe_timeout);
        let policy = RecoveryPolicy::new(
            self.config.watchdog.failure_threshold,
            self.config.watchdog.recovery_cooldown,
            self.config.watchdog.recover_on_probe_error,
        );
        let scheduler = Scheduler::new(
            reconciler,
            store.clone(),
            policy,
            dispatcher.clone(),
            dispatcher,
            self.config.watchdog.poll_interval,
            shutdown.clone(),
        );

        let scheduler_handle = tokio::spawn(scheduler.run());

        let http = HttpServer::new(store, metrics, self.config.server.listen_addr.clone());
        let http_shutdown = shutdown.clone();
        let http_handle = tokio::spawn(async move {
            if let Err(e) = http.run(http_shutdown).await {
                warn!(error = %e, "HTTP server error");
            }
        });

        info!("all tasks spawned, watchdog running");

        wait_for_signal().await?;
        info!("shutdown signal received");

        // No further rounds are scheduled; the in-flight round drains
        shutdown.cancel();
        let _ = scheduler_handle.await;
        let _ = http_handle.await;

        info!("watchdog server stopped");
        Ok(())
    }
}

async fn wait_for_signal() -> common::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    Ok(())
}
