//! Core types for the health-reconciliation engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A monitored service, fixed at configuration load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service identifier, used in metrics labels and alerts
    pub name: String,

    /// What to probe and how
    #[serde(flatten)]
    pub probe: ProbeTarget,

    /// Disabled services are skipped by the reconciler
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServiceSpec {
    /// Create an HTTP-probed service spec.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: ProbeTarget::Http {
                url: url.into(),
                accept_status: None,
            },
            enabled: true,
        }
    }

    /// Create a container-state-probed service spec.
    pub fn container(name: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: ProbeTarget::Container {
                container: container.into(),
            },
            enabled: true,
        }
    }
}

/// Probe target, chosen per service rather than as a global mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "probe", rename_all = "lowercase")]
pub enum ProbeTarget {
    /// HTTP GET against a URL; healthy on 2xx or the accepted status
    Http {
        url: String,
        /// Additional acceptable status code outside the 2xx range
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accept_status: Option<u16>,
    },

    /// Container-state lookup; healthy iff a matching container is running
    Container { container: String },
}

/// Recorded health status of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Never probed yet
    Unknown,
    /// Last probe succeeded
    Healthy,
    /// Service reported down (non-2xx response or non-running container)
    Unhealthy,
    /// Probe infrastructure failed (timeout, transport, runtime API)
    Error,
}

impl HealthStatus {
    /// Whether this status counts as healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Error => write!(f, "error"),
        }
    }
}

/// Probe-level failure, distinct from an application-reported down state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeFailure {
    #[error("probe timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Service answered healthy
    Up,
    /// Service answered, but reported itself down
    Down(String),
    /// The probe itself failed before reaching a verdict
    ProbeError(ProbeFailure),
}

impl Outcome {
    /// Whether the outcome counts as healthy.
    pub fn is_up(&self) -> bool {
        matches!(self, Outcome::Up)
    }

    /// Status this outcome resolves to.
    pub fn status(&self) -> HealthStatus {
        match self {
            Outcome::Up => HealthStatus::Healthy,
            Outcome::Down(_) => HealthStatus::Unhealthy,
            Outcome::ProbeError(_) => HealthStatus::Error,
        }
    }
}

/// Per-service health state, mutated only during round application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthState {
    pub status: HealthStatus,
    pub last_changed_at: SystemTime,
    pub consecutive_failures: u32,
    pub last_probe_at: SystemTime,
    pub last_recovery_attempt_at: Option<SystemTime>,
}

impl HealthState {
    /// Initial state for a service that has never been probed.
    pub fn unknown(now: SystemTime) -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_changed_at: now,
            consecutive_failures: 0,
            last_probe_at: now,
            last_recovery_attempt_at: None,
        }
    }
}

/// A status boundary crossing, emitted once per change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub service: String,
    pub from: HealthStatus,
    pub to: HealthStatus,
    pub occurred_at: SystemTime,
}

/// Signal that a service should be restarted. The restart itself is
/// delegated to an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryIntent {
    pub service: String,
    pub reason: String,
    pub attempted_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_display() {
        assert_eq!(HealthStatus::Unknown.to_string(), "unknown");
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(HealthStatus::Unhealthy.to_string(), "unhealthy");
        assert_eq!(HealthStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(Outcome::Up.status(), HealthStatus::Healthy);
        assert_eq!(
            Outcome::Down("503".to_string()).status(),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            Outcome::ProbeError(ProbeFailure::Timeout).status(),
            HealthStatus::Error
        );
    }

    #[test]
    fn test_service_spec_yaml() {
        let yaml = r#"
name: audio
probe: http
url: "http://localhost:8001/health"
"#;
        let spec: ServiceSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name, "audio");
        assert!(spec.enabled);
        assert_eq!(
            spec.probe,
            ProbeTarget::Http {
                url: "http://localhost:8001/health".to_string(),
                accept_status: None,
            }
        );

        let yaml = r#"
name: postgres
probe: container
container: postgres
enabled: false
"#;
        let spec: ServiceSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(!spec.enabled);
        assert_eq!(
            spec.probe,
            ProbeTarget::Container {
                container: "postgres".to_string()
            }
        );
    }
}
