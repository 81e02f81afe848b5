//! Prometheus metrics for the watchdog server.

use crate::dispatcher::HealthMetrics;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::time::Duration;
use watchdog::types::Transition;

/// Labels for per-service metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ServiceLabels {
    /// Service name
    pub service: String,
}

/// Labels for state transition metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TransitionLabels {
    /// Service name
    pub service: String,
    /// From status
    pub from: String,
    /// To status
    pub to: String,
}

/// Labels for HTTP request metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// HTTP method
    pub method: String,
    /// Request path
    pub endpoint: String,
    /// Response status code
    pub status: String,
}

/// Metrics registry with all watchdog server metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Current health per service (1=healthy, 0=unhealthy)
    service_health: Family<ServiceLabels, Gauge>,
    /// Restart/incident counter per service
    service_restarts_total: Family<ServiceLabels, Counter>,
    /// Health state transitions
    transitions_total: Family<TransitionLabels, Counter>,
    /// HTTP requests served
    requests_total: Family<RequestLabels, Counter>,
    /// Reconciliation round duration
    round_duration_seconds: Histogram,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let service_health = Family::<ServiceLabels, Gauge>::default();
        registry.register(
            "watchdog_service_health",
            "Service health status (1=healthy, 0=unhealthy)",
            service_health.clone(),
        );

        let service_restarts_total = Family::<ServiceLabels, Counter>::default();
        registry.register(
            "watchdog_service_restarts",
            "Total number of service down incidents",
            service_restarts_total.clone(),
        );

        let transitions_total = Family::<TransitionLabels, Counter>::default();
        registry.register(
            "watchdog_transitions",
            "Total health state transitions",
            transitions_total.clone(),
        );

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "watchdog_requests",
            "Total number of HTTP requests",
            requests_total.clone(),
        );

        // Exponential buckets from 1ms to ~30s
        let round_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 15));
        registry.register(
            "watchdog_round_duration_seconds",
            "Reconciliation round duration in seconds",
            round_duration_seconds.clone(),
        );

        Self {
            registry,
            service_health,
            service_restarts_total,
            transitions_total,
            requests_total,
            round_duration_seconds,
        }
    }

    /// Record an HTTP request
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16) {
        self.requests_total
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                endpoint: endpoint.to_string(),
                status: status.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMetrics for MetricsRegistry {
    fn set_health(&self, service: &str, healthy: bool) {
        self.service_health
            .get_or_create(&ServiceLabels {
                service: service.to_string(),
            })
            .set(if healthy { 1 } else { 0 });
    }

    fn inc_restart(&self, service: &str) {
        self.service_restarts_total
            .get_or_create(&ServiceLabels {
                service: service.to_string(),
            })
            .inc();
    }

    fn record_transition(&self, transition: &Transition) {
        self.transitions_total
            .get_or_create(&TransitionLabels {
                service: transition.service.clone(),
                from: transition.from.to_string(),
                to: transition.to.to_string(),
            })
            .inc();
    }

    fn observe_round(&self, duration: Duration) {
        self.round_duration_seconds.observe(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;
    use watchdog::types::HealthStatus;
    use std::time::SystemTime;

    #[test]
    fn test_health_gauge_values() {
        let registry = MetricsRegistry::new();

        registry.set_health("audio", false);
        registry.set_health("audio", true);
        registry.inc_restart("audio");
        registry.observe_round(Duration::from_millis(5));

        let mut buffer = String::new();
        encode(&mut buffer, &registry.registry).unwrap();
        assert!(buffer.contains("watchdog_service_health{service=\"audio\"} 1"));
        assert!(buffer.contains("watchdog_service_restarts_total{service=\"audio\"} 1"));
    }

    #[test]
    fn test_transition_labels() {
        let registry = MetricsRegistry::new();
        registry.record_transition(&Transition {
            service: "audio".to_string(),
            from: HealthStatus::Unknown,
            to: HealthStatus::Unhealthy,
            occurred_at: SystemTime::UNIX_EPOCH,
        });

        let mut buffer = String::new();
        encode(&mut buffer, &registry.registry).unwrap();
        assert!(buffer.contains("from=\"unknown\""));
        assert!(buffer.contains("to=\"unhealthy\""));
    }

    #[test]
    fn test_request_counter() {
        let registry = MetricsRegistry::new();
        registry.record_request("GET", "/health", 200);
        registry.record_request("GET", "/health", 200);
        registry.record_request("GET", "/status", 503);

        let mut buffer = String::new();
        encode(&mut buffer, &registry.registry).unwrap();
        assert!(buffer.contains("endpoint=\"/health\""));
        assert!(buffer.contains("status=\"503\""));
    }
}
