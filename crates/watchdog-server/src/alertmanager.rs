//! Alertmanager push client.

use crate::dispatcher::{AlertSink, SinkError};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A Prometheus alert.
///
/// A firing alert carries `starts_at`; a resolution carries the same
/// identifying labels and `ends_at` only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub labels: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(
        rename = "startsAt",
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub starts_at: Option<SystemTime>,

    #[serde(
        rename = "endsAt",
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub ends_at: Option<SystemTime>,
}

impl Alert {
    /// Firing ServiceDown alert for a failed service.
    pub fn service_down(
        service: &str,
        severity: &str,
        job: &str,
        description: &str,
        now: SystemTime,
    ) -> Self {
        let labels = BTreeMap::from([
            ("alertname".to_string(), "ServiceDown".to_string()),
            ("service".to_string(), service.to_string()),
            ("severity".to_string(), severity.to_string()),
            ("job".to_string(), job.to_string()),
        ]);
        let annotations = BTreeMap::from([
            (
                "summary".to_string(),
                format!("Service {} is down", service),
            ),
            ("description".to_string(), description.to_string()),
        ]);

        Self {
            labels,
            annotations,
            starts_at: Some(now),
            ends_at: None,
        }
    }

    /// Resolution for a previously fired ServiceDown alert.
    pub fn service_recovered(service: &str, severity: &str, job: &str, now: SystemTime) -> Self {
        let labels = BTreeMap::from([
            ("alertname".to_string(), "ServiceDown".to_string()),
            ("service".to_string(), service.to_string()),
            ("severity".to_string(), severity.to_string()),
            ("job".to_string(), job.to_string()),
        ]);

        Self {
            labels,
            annotations: BTreeMap::new(),
            starts_at: None,
            ends_at: Some(now),
        }
    }
}

/// Sends alerts to a Prometheus Alertmanager.
pub struct AlertmanagerClient {
    base_url: String,
    client: reqwest::Client,
}

impl AlertmanagerClient {
    /// Create a client for the given Alertmanager base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl AlertSink for AlertmanagerClient {
    async fn notify(&self, alert: Alert) -> Result<(), SinkError> {
        let url = format!("{}/api/v2/alerts", self.base_url.trim_end_matches('/'));

        // Alertmanager expects a JSON array of alerts
        let response = self.client.post(&url).json(&[&alert]).send().await?;

        let status = response.status().as_u16();
        if status != 200 && status != 202 {
            return Err(SinkError::Status {
                sink: "alertmanager",
                status,
            });
        }

        debug!(labels = ?alert.labels, "alert delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn test_firing_alert_shape() {
        let alert = Alert::service_down("audio", "critical", "watchdog", "health check failed", now());

        assert_eq!(alert.labels["alertname"], "ServiceDown");
        assert_eq!(alert.labels["service"], "audio");
        assert_eq!(alert.labels["severity"], "critical");
        assert_eq!(alert.labels["job"], "watchdog");
        assert!(alert.starts_at.is_some());
        assert!(alert.ends_at.is_none());

        let json = serde_json::to_value(&alert).unwrap();
        assert!(json.get("startsAt").is_some());
        assert!(json.get("endsAt").is_none());
        assert_eq!(json["annotations"]["summary"], "Service audio is down");
    }

    #[test]
    fn test_resolution_alert_shape() {
        let alert = Alert::service_recovered("audio", "critical", "watchdog", now());

        assert_eq!(alert.labels["alertname"], "ServiceDown");
        assert!(alert.starts_at.is_none());
        assert!(alert.ends_at.is_some());

        let json = serde_json::to_value(&alert).unwrap();
        assert!(json.get("startsAt").is_none());
        assert!(json.get("endsAt").is_some());
        // Empty annotations are omitted entirely
        assert!(json.get("annotations").is_none());
    }

    #[test]
    fn test_timestamps_serialize_as_rfc3339() {
        let alert = Alert::service_down("audio", "critical", "watchdog", "x", now());
        let json = serde_json::to_value(&alert).unwrap();
        let starts_at = json["startsAt"].as_str().unwrap();
        assert!(starts_at.starts_with("2023-11-14T"), "got {}", starts_at);
    }
}
