//! Watchdog server.
//!
//! Wraps the health-reconciliation engine from the `watchdog` crate with
//! its operational surface:
//!
//! - **Config**: YAML configuration with validation and search paths
//! - **MetricsRegistry**: Prometheus metrics, exposed on `/metrics`
//! - **HttpServer**: `/health`, `/status`, `/metrics`, and a dashboard
//! - **Dispatcher**: turns transitions into metric updates, Alertmanager
//!   alerts, and Loki log lines
//! - **DockerRuntime**: container-state probes against the local daemon

pub mod alertmanager;
pub mod config;
pub mod dispatcher;
pub mod http_server;
pub mod loki;
pub mod metrics;
pub mod runtime;
pub mod server;

pub use alertmanager::{Alert, AlertmanagerClient};
pub use config::{Config, ConfigError};
pub use dispatcher::{AlertSink, Dispatcher, HealthMetrics, LogSink, SinkError};
pub use http_server::HttpServer;
pub use loki::LokiClient;
pub use metrics::MetricsRegistry;
pub use server::WatchdogServer;
