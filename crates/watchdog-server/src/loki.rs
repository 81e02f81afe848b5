//! Loki log push client.

use crate::dispatcher::{LogSink, SinkError};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A Loki log stream: labels plus [timestamp_ns, line] pairs.
#[derive(Debug, Clone, Serialize)]
struct LokiStream {
    stream: BTreeMap<String, String>,
    values: Vec<[String; 2]>,
}

/// Push request body for the Loki HTTP API.
#[derive(Debug, Clone, Serialize)]
struct LokiPushRequest {
    streams: Vec<LokiStream>,
}

/// Pushes log lines to Grafana Loki.
pub struct LokiClient {
    base_url: String,
    job: String,
    client: reqwest::Client,
}

impl LokiClient {
    /// Create a client for the given Loki base URL.
    pub fn new(base_url: impl Into<String>, job: impl Into<String>) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into(),
            job: job.into(),
            client,
        })
    }

    async fn push(&self, labels: BTreeMap<String, String>, message: &str) -> Result<(), SinkError> {
        let timestamp_ns = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_string();

        let body = LokiPushRequest {
            streams: vec![LokiStream {
                stream: labels,
                values: vec![[timestamp_ns, message.to_string()]],
            }],
        };

        let url = format!("{}/loki/api/v1/push", self.base_url.trim_end_matches('/'));
        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status().as_u16();
        if status != 200 && status != 204 {
            return Err(SinkError::Status {
                sink: "loki",
                status,
            });
        }

        debug!(message, "log line delivered");
        Ok(())
    }
}

#[async_trait]
impl LogSink for LokiClient {
    async fn push_service_log(
        &self,
        service: &str,
        level: &str,
        message: &str,
    ) -> Result<(), SinkError> {
        let labels = BTreeMap::from([
            ("job".to_string(), self.job.clone()),
            ("service".to_string(), service.to_string()),
            ("level".to_string(), level.to_string()),
        ]);
        self.push(labels, message).await
    }
}
