//! Recovery-trigger policy.

use crate::store::HealthStore;
use crate::types::{HealthStatus, RecoveryIntent};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Decides when accumulated unhealthy state warrants a recovery attempt.
///
/// Emits an intent once `consecutive_failures` reaches the threshold,
/// then debounces further emissions for the cooldown window. Services in
/// `Error` status (probe-infrastructure failure) are excluded unless
/// explicitly configured as recovery-eligible, to avoid restart loops
/// triggered by e.g. DNS outages unrelated to the service itself.
pub struct RecoveryPolicy {
    failure_threshold: u32,
    cooldown: Duration,
    recover_on_probe_error: bool,
}

impl RecoveryPolicy {
    /// Create a policy.
    pub fn new(failure_threshold: u32, cooldown: Duration, recover_on_probe_error: bool) -> Self {
        Self {
            failure_threshold,
            cooldown,
            recover_on_probe_error,
        }
    }

    /// Evaluate one service, emitting an intent when the policy fires.
    ///
    /// On emission the attempt timestamp is recorded in the store, so the
    /// same incident cannot fire again within the cooldown.
    pub fn evaluate(
        &self,
        store: &HealthStore,
        service: &str,
        now: SystemTime,
    ) -> Option<RecoveryIntent> {
        let state = store.get(service)?;

        let eligible = match state.status {
            HealthStatus::Unhealthy => true,
            HealthStatus::Error => self.recover_on_probe_error,
            HealthStatus::Unknown | HealthStatus::Healthy => false,
        };
        if !eligible || state.consecutive_failures < self.failure_threshold {
            return None;
        }

        if let Some(last_attempt) = state.last_recovery_attempt_at {
            let since = now.duration_since(last_attempt).unwrap_or_default();
            if since < self.cooldown {
                debug!(
                    service,
                    since_secs = since.as_secs(),
                    "recovery debounced within cooldown"
                );
                return None;
            }
        }

        store.mark_recovery_attempt(service, now);

        Some(RecoveryIntent {
            service: service.to_string(),
            reason: format!(
                "{} consecutive failed probes",
                state.consecutive_failures
            ),
            attempted_at: now,
        })
    }
}
