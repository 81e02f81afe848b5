//! Per-round probing and state application.

use crate::prober::Prober;
use crate::store::HealthStore;
use crate::types::{Outcome, ProbeFailure, ServiceSpec, Transition};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;
use tracing::debug;

/// Drives one polling round across all configured services.
///
/// Probes fan out concurrently so a slow service never delays the
/// assessment of others; the round joins on all outcomes (or their
/// individual timeouts) before applying results, so no two rounds can
/// interleave writes for the same service.
pub struct Reconciler {
    services: Vec<(ServiceSpec, Arc<dyn Prober>)>,
    store: Arc<HealthStore>,
    probe_timeout: Duration,
}

impl Reconciler {
    /// Create a reconciler over a fixed service registry.
    pub fn new(
        services: Vec<(ServiceSpec, Arc<dyn Prober>)>,
        store: Arc<HealthStore>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            services,
            store,
            probe_timeout,
        }
    }

    /// Names of the enabled services, for recovery evaluation.
    pub fn service_names(&self) -> Vec<String> {
        self.services
            .iter()
            .filter(|(spec, _)| spec.enabled)
            .map(|(spec, _)| spec.name.clone())
            .collect()
    }

    /// Run one reconciliation round.
    ///
    /// Never blocks beyond the per-probe timeout; disabled services are
    /// skipped. Returns the transitions this round produced.
    pub async fn run_round(&self, now: SystemTime) -> Vec<Transition> {
        let probes = self
            .services
            .iter()
            .filter(|(spec, _)| spec.enabled)
            .map(|(spec, prober)| {
                let name = spec.name.clone();
                let prober = prober.clone();
                let probe_timeout = self.probe_timeout;
                async move {
                    let outcome = match timeout(probe_timeout, prober.probe()).await {
                        Ok(outcome) => outcome,
                        Err(_) => Outcome::ProbeError(ProbeFailure::Timeout),
                    };
                    debug!(service = %name, kind = prober.kind(), ?outcome, "probe completed");
                    (name, outcome)
                }
            });

        let outcomes = futures::future::join_all(probes).await;

        let mut transitions = Vec::new();
        for (service, outcome) in outcomes {
            if let Some(transition) = self.store.apply(&service, &outcome, now) {
                transitions.push(transition);
            }
        }
        transitions
    }
}
