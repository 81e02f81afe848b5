//! Configuration loading and validation for the watchdog server.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};
use watchdog::types::{ProbeTarget, ServiceSpec};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub watchdog: WatchdogSettings,

    #[serde(default)]
    pub alerting: AlertingSettings,

    /// Fixed registry of monitored services
    #[serde(default)]
    pub services: Vec<ServiceSpec>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.server.validate()?;
        self.watchdog.validate()?;
        self.alerting.validate()?;

        if let Err(e) = validate_services(&self.services) {
            let mut errors = ValidationErrors::new();
            errors.add("services", e);
            return Err(errors);
        }

        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerSettings {
    #[validate(length(min = 1))]
    pub listen_addr: String,
}

/// Reconciliation loop settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WatchdogSettings {
    /// Interval between reconciliation rounds
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_poll_interval")]
    pub poll_interval: Duration,

    /// Per-probe timeout within a round
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_probe_timeout")]
    pub probe_timeout: Duration,

    /// Consecutive failures before a recovery intent is emitted
    #[validate(range(min = 1, max = 100))]
    pub failure_threshold: u32,

    /// Minimum time between recovery intents for the same service
    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_recovery_cooldown")]
    pub recovery_cooldown: Duration,

    /// Whether probe-infrastructure failures count as recovery-eligible
    #[serde(default)]
    pub recover_on_probe_error: bool,
}

/// Alert and log sink settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AlertingSettings {
    /// Alertmanager base URL; alerts are disabled when unset
    #[validate(url)]
    pub alertmanager_url: Option<String>,

    /// Loki base URL; log pushing is disabled when unset
    #[validate(url)]
    pub loki_url: Option<String>,

    /// Severity label attached to firing alerts
    #[serde(default = "default_severity")]
    #[validate(length(min = 1))]
    pub severity: String,

    /// Job label attached to alerts and log streams
    #[serde(default = "default_job")]
    #[validate(length(min = 1))]
    pub job: String,
}

fn default_severity() -> String {
    "critical".to_string()
}

fn default_job() -> String {
    "watchdog".to_string()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8006".to_string(),
        }
    }
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            failure_threshold: 3,
            recovery_cooldown: Duration::from_secs(60),
            recover_on_probe_error: false,
        }
    }
}

impl Default for AlertingSettings {
    fn default() -> Self {
        Self {
            alertmanager_url: None,
            loki_url: None,
            severity: "critical".to_string(),
            job: "watchdog".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: None,
            format: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            watchdog: WatchdogSettings::default(),
            alerting: AlertingSettings::default(),
            services: Vec::new(),
            logging: LoggingSettings::default(),
        }
    }
}

// Custom validators

fn validate_poll_interval(interval: &Duration) -> Result<(), ValidationError> {
    let secs = interval.as_secs();
    if !(1..=300).contains(&secs) {
        return Err(ValidationError::new("poll_interval_out_of_range"));
    }
    Ok(())
}

fn validate_probe_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let millis = timeout.as_millis();
    if !(100..=60_000).contains(&millis) {
        return Err(ValidationError::new("probe_timeout_out_of_range"));
    }
    Ok(())
}

fn validate_recovery_cooldown(cooldown: &Duration) -> Result<(), ValidationError> {
    let secs = cooldown.as_secs();
    if !(1..=3600).contains(&secs) {
        return Err(ValidationError::new("recovery_cooldown_out_of_range"));
    }
    Ok(())
}

fn validate_services(services: &[ServiceSpec]) -> Result<(), ValidationError> {
    let mut names = HashSet::new();

    for spec in services {
        if spec.name.trim().is_empty() {
            return Err(ValidationError::new("service_name_empty"));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(ValidationError::new("service_name_duplicate"));
        }

        match &spec.probe {
            ProbeTarget::Http { url, .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ValidationError::new("service_url_invalid"));
                }
            }
            ProbeTarget::Container { container } => {
                if container.trim().is_empty() {
                    return Err(ValidationError::new("service_container_empty"));
                }
            }
        }
    }

    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/watchdog/watchdog.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./watchdog.yaml"));

        paths
            .into_iter()
            .find(|p: &PathBuf| p.exists() && p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/watchdog/watchdog.yaml"))
    }

    /// Whether any enabled service uses a container-state probe
    pub fn needs_container_runtime(&self) -> bool {
        self.services
            .iter()
            .any(|s| s.enabled && matches!(s.probe, ProbeTarget::Container { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_valid_yaml_parsing() {
        let yaml = r#"
server:
  listen_addr: "127.0.0.1:8006"

watchdog:
  poll_interval: 15s
  probe_timeout: 5s
  failure_threshold: 3
  recovery_cooldown: 60s

alerting:
  alertmanager_url: "http://localhost:9093"
  loki_url: "http://localhost:3100"
  severity: critical
  job: watchdog

services:
  - name: backend
    probe: http
    url: "http://localhost:8000/health"
  - name: postgres
    probe: container
    container: postgres
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.listen_addr, "127.0.0.1:8006");
        assert_eq!(config.watchdog.poll_interval, Duration::from_secs(15));
        assert_eq!(config.services.len(), 2);
        assert!(config.needs_container_runtime());
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let yaml = r#"
services:
  - name: backend
    probe: http
    url: "http://localhost:8000/health"
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.watchdog.poll_interval, Duration::from_secs(30));
        assert_eq!(config.watchdog.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.watchdog.failure_threshold, 3);
        assert_eq!(config.watchdog.recovery_cooldown, Duration::from_secs(60));
        assert!(!config.watchdog.recover_on_probe_error);
        assert!(config.alerting.alertmanager_url.is_none());
        assert!(!config.needs_container_runtime());
    }

    #[test]
    fn test_invalid_poll_interval() {
        let yaml = r#"
watchdog:
  poll_interval: 500ms  # Invalid: < 1s
  probe_timeout: 5s
  failure_threshold: 3
  recovery_cooldown: 60s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
watchdog:
  poll_interval: 10m  # Invalid: > 5m
  probe_timeout: 5s
  failure_threshold: 3
  recovery_cooldown: 60s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_failure_threshold() {
        let yaml = r#"
watchdog:
  poll_interval: 30s
  probe_timeout: 5s
  failure_threshold: 0  # Invalid: < 1
  recovery_cooldown: 60s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_service_names_rejected() {
        let yaml = r#"
services:
  - name: backend
    probe: http
    url: "http://localhost:8000/health"
  - name: backend
    probe: container
    container: backend
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_service_url_rejected() {
        let yaml = r#"
services:
  - name: backend
    probe: http
    url: "localhost:8000/health"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_container_service_needs_no_runtime() {
        let yaml = r#"
services:
  - name: postgres
    probe: container
    container: postgres
    enabled: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.needs_container_runtime());
    }

    #[test]
    fn test_humantime_serde_parsing() {
        let yaml = r#"
watchdog:
  poll_interval: 1m
  probe_timeout: 2500ms
  failure_threshold: 5
  recovery_cooldown: 5m
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watchdog.poll_interval, Duration::from_secs(60));
        assert_eq!(config.watchdog.probe_timeout, Duration::from_millis(2500));
        assert_eq!(config.watchdog.recovery_cooldown, Duration::from_secs(300));
    }
}
