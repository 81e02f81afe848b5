//! In-memory health state store.

use crate::types::{HealthState, HealthStatus, Outcome, Transition};
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::SystemTime;

/// Mapping from service name to its current health state.
///
/// Mutated exclusively by the reconciler while a round is applied; read
/// concurrently by the dispatcher, the recovery policy, and the HTTP
/// health endpoint. Entries are created on first observation and persist
/// for the process lifetime.
#[derive(Default)]
pub struct HealthStore {
    entries: DashMap<String, HealthState>,
}

impl HealthStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a service, if it has been observed.
    pub fn get(&self, service: &str) -> Option<HealthState> {
        self.entries.get(service).map(|e| *e.value())
    }

    /// Point-in-time copy of all entries, safe to take between rounds.
    pub fn snapshot(&self) -> HashMap<String, HealthState> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    /// Apply one probe outcome, returning a transition iff the status
    /// crossed a boundary.
    ///
    /// The first observation of a service is applied against `Unknown`,
    /// so the very first result always produces a transition. Repeated
    /// identical statuses emit nothing but still advance
    /// `consecutive_failures` for the recovery policy to observe.
    pub fn apply(&self, service: &str, outcome: &Outcome, now: SystemTime) -> Option<Transition> {
        let mut entry = self
            .entries
            .entry(service.to_string())
            .or_insert_with(|| HealthState::unknown(now));

        let from = entry.status;
        let to = outcome.status();

        entry.last_probe_at = now;
        match outcome {
            Outcome::Up => entry.consecutive_failures = 0,
            Outcome::Down(_) | Outcome::ProbeError(_) => {
                entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
            }
        }

        if to == from {
            return None;
        }

        entry.status = to;
        entry.last_changed_at = now;

        Some(Transition {
            service: service.to_string(),
            from,
            to,
            occurred_at: now,
        })
    }

    /// Record a recovery attempt timestamp, debouncing further intents.
    pub fn mark_recovery_attempt(&self, service: &str, now: SystemTime) {
        if let Some(mut entry) = self.entries.get_mut(service) {
            entry.last_recovery_attempt_at = Some(now);
        }
    }

    /// Number of tracked services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no service has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every tracked service is currently healthy.
    pub fn all_healthy(&self) -> bool {
        self.entries.iter().all(|e| e.status == HealthStatus::Healthy)
    }
}
