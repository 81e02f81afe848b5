//! Transition-driven alert, metric, and log emission.

use crate::alertmanager::Alert;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use watchdog::scheduler::{RecoverySink, TransitionSink};
use watchdog::types::{HealthStatus, RecoveryIntent, Transition};

/// Sink delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{sink} returned status {status}")]
    Status { sink: &'static str, status: u16 },
}

/// Alert-forwarding sink (Alertmanager).
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert (firing or resolution).
    async fn notify(&self, alert: Alert) -> Result<(), SinkError>;
}

/// Log-forwarding sink (Loki).
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver one log line tagged with the service and level.
    async fn push_service_log(
        &self,
        service: &str,
        level: &str,
        message: &str,
    ) -> Result<(), SinkError>;
}

/// Metrics sink consumed by the dispatcher. Injected so tests can
/// substitute a recording fake.
pub trait HealthMetrics: Send + Sync {
    /// Set the health gauge for a service.
    fn set_health(&self, service: &str, healthy: bool);

    /// Count a down incident for a service.
    fn inc_restart(&self, service: &str);

    /// Count a state transition.
    fn record_transition(&self, transition: &Transition);

    /// Observe a reconciliation round duration.
    fn observe_round(&self, duration: Duration);
}

/// Converts detected transitions into metric updates, alerts, and log
/// lines, and forwards recovery intents to the log sink.
///
/// The three side effects are independent: alert and log delivery are
/// spawned fire-and-forget, so sink latency or failure never blocks the
/// next round nor rolls back the state transition that triggered them.
pub struct Dispatcher {
    metrics: Arc<dyn HealthMetrics>,
    alerts: Option<Arc<dyn AlertSink>>,
    logs: Option<Arc<dyn LogSink>>,
    severity: String,
    job: String,
}

impl Dispatcher {
    /// Create a dispatcher. Sinks are optional; metrics are not.
    pub fn new(
        metrics: Arc<dyn HealthMetrics>,
        alerts: Option<Arc<dyn AlertSink>>,
        logs: Option<Arc<dyn LogSink>>,
        severity: impl Into<String>,
        job: impl Into<String>,
    ) -> Self {
        Self {
            metrics,
            alerts,
            logs,
            severity: severity.into(),
            job: job.into(),
        }
    }

    fn send_alert(&self, alert: Alert) {
        if let Some(sink) = &self.alerts {
            let sink = sink.clone();
            tokio::spawn(async move {
                if let Err(e) = sink.notify(alert).await {
                    warn!(error = %e, "failed to deliver alert");
                }
            });
        }
    }

    fn send_log(&self, service: &str, level: &str, message: String) {
        if let Some(sink) = &self.logs {
            let sink = sink.clone();
            let service = service.to_string();
            let level = level.to_string();
            tokio::spawn(async move {
                if let Err(e) = sink.push_service_log(&service, &level, &message).await {
                    warn!(error = %e, "failed to push log line");
                }
            });
        }
    }
}

#[async_trait]
impl TransitionSink for Dispatcher {
    async fn dispatch(&self, transition: &Transition) {
        let service = transition.service.as_str();

        // Metric update happens regardless of sink availability
        self.metrics
            .set_health(service, transition.to == HealthStatus::Healthy);
        self.metrics.record_transition(transition);

        match transition.to {
            HealthStatus::Unhealthy | HealthStatus::Error => {
                self.metrics.inc_restart(service);
                self.send_alert(Alert::service_down(
                    service,
                    &self.severity,
                    &self.job,
                    &format!(
                        "Service {} has failed health check ({} -> {})",
                        service, transition.from, transition.to
                    ),
                    transition.occurred_at,
                ));
                self.send_log(
                    service,
                    "warning",
                    format!("service {} is {}", service, transition.to),
                );
            }
            HealthStatus::Healthy => {
                // First observation announces state without resolving
                // an alert that never fired
                if transition.from != HealthStatus::Unknown {
                    self.send_alert(Alert::service_recovered(
                        service,
                        &self.severity,
                        &self.job,
                        transition.occurred_at,
                    ));
                }
                self.send_log(service, "info", format!("service {} is healthy", service));
            }
            HealthStatus::Unknown => {}
        }

        info!(
            service,
            from = %transition.from,
            to = %transition.to,
            "health state changed"
        );
    }

    async fn round_completed(&self, duration: Duration, transitions: usize) {
        self.metrics.observe_round(duration);
        if transitions > 0 {
            info!(transitions, duration_ms = duration.as_millis() as u64, "round completed");
        }
    }
}

#[async_trait]
impl RecoverySink for Dispatcher {
    async fn recover(&self, intent: &RecoveryIntent) {
        // The restart itself is delegated to an external collaborator;
        // the intent is the output.
        warn!(
            service = %intent.service,
            reason = %intent.reason,
            "recovery intent emitted"
        );
        self.send_log(
            &intent.service,
            "warning",
            format!("restart requested for {}: {}", intent.service, intent.reason),
        );
    }
}
