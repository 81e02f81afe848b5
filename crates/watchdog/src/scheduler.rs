//! Fixed-interval reconciliation loop.

use crate::reconciler::Reconciler;
use crate::recovery::RecoveryPolicy;
use crate::store::HealthStore;
use crate::types::{RecoveryIntent, Transition};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Receives detected transitions. Implemented by the alert/metric
/// dispatcher; tests substitute a recording fake.
#[async_trait]
pub trait TransitionSink: Send + Sync {
    /// Handle one transition.
    async fn dispatch(&self, transition: &Transition);

    /// Called once per round after all transitions were dispatched.
    async fn round_completed(&self, duration: Duration, transitions: usize) {
        let _ = (duration, transitions);
    }
}

/// Receives recovery intents. The act of restarting is delegated to an
/// external collaborator.
#[async_trait]
pub trait RecoverySink: Send + Sync {
    /// Handle one recovery intent.
    async fn recover(&self, intent: &RecoveryIntent);
}

/// Fires reconciliation rounds at a fixed interval until cancelled.
///
/// Rounds never overlap: each round runs to completion, its transitions
/// are dispatched and the recovery policy evaluated, before the next tick
/// is observed. Cancellation is observed between rounds; an in-flight
/// round finishes naturally, bounded by the per-probe timeouts.
pub struct Scheduler {
    reconciler: Reconciler,
    store: Arc<HealthStore>,
    policy: RecoveryPolicy,
    transitions: Arc<dyn TransitionSink>,
    recovery: Arc<dyn RecoverySink>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler.
    pub fn new(
        reconciler: Reconciler,
        store: Arc<HealthStore>,
        policy: RecoveryPolicy,
        transitions: Arc<dyn TransitionSink>,
        recovery: Arc<dyn RecoverySink>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            store,
            policy,
            transitions,
            recovery,
            poll_interval,
            shutdown,
        }
    }

    /// Run the scheduling loop until the token is cancelled.
    ///
    /// The first tick fires immediately, so the initial state of every
    /// service is announced right after startup.
    pub async fn run(self) {
        info!(interval_secs = self.poll_interval.as_secs(), "watchdog scheduler started");

        let mut tick = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.run_once().await;
                }
                _ = self.shutdown.cancelled() => {
                    info!("watchdog scheduler stopping");
                    break;
                }
            }
        }
    }

    /// Run one round: probe, apply, dispatch, evaluate recovery.
    pub async fn run_once(&self) {
        let started = std::time::Instant::now();
        let now = SystemTime::now();

        let transitions = self.reconciler.run_round(now).await;
        for transition in &transitions {
            self.transitions.dispatch(transition).await;
        }

        for service in self.reconciler.service_names() {
            if let Some(intent) = self.policy.evaluate(&self.store, &service, now) {
                self.recovery.recover(&intent).await;
            }
        }

        self.transitions
            .round_completed(started.elapsed(), transitions.len())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::Prober;
    use crate::types::{HealthStatus, Outcome, ServiceSpec};
    use std::sync::Mutex;

    struct ScriptedProber {
        outcomes: Mutex<Vec<Outcome>>,
    }

    impl ScriptedProber {
        fn new(outcomes: Vec<Outcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self) -> Outcome {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                Outcome::Up
            } else {
                outcomes.remove(0)
            }
        }

        fn kind(&self) -> &str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        transitions: Mutex<Vec<Transition>>,
        intents: Mutex<Vec<RecoveryIntent>>,
        rounds: Mutex<usize>,
    }

    #[async_trait]
    impl TransitionSink for RecordingSink {
        async fn dispatch(&self, transition: &Transition) {
            self.transitions.lock().unwrap().push(transition.clone());
        }

        async fn round_completed(&self, _duration: Duration, _transitions: usize) {
            *self.rounds.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl RecoverySink for RecordingSink {
        async fn recover(&self, intent: &RecoveryIntent) {
            self.intents.lock().unwrap().push(intent.clone());
        }
    }

    fn down() -> Outcome {
        Outcome::Down("refused".to_string())
    }

    fn scheduler_for(
        outcomes: Vec<Outcome>,
        policy: RecoveryPolicy,
        store: Arc<HealthStore>,
        sink: Arc<RecordingSink>,
        shutdown: CancellationToken,
    ) -> Scheduler {
        let services: Vec<(ServiceSpec, Arc<dyn Prober>)> = vec![(
            ServiceSpec::http("audio", "http://audio/health"),
            Arc::new(ScriptedProber::new(outcomes)),
        )];
        let reconciler = Reconciler::new(services, store.clone(), Duration::from_secs(1));
        Scheduler::new(
            reconciler,
            store,
            policy,
            sink.clone(),
            sink,
            Duration::from_secs(30),
            shutdown,
        )
    }

    #[tokio::test]
    async fn test_down_down_up_scenario() {
        let store = Arc::new(HealthStore::new());
        let sink = Arc::new(RecordingSink::default());
        let scheduler = scheduler_for(
            vec![down(), down(), Outcome::Up],
            RecoveryPolicy::new(10, Duration::from_secs(60), false),
            store.clone(),
            sink.clone(),
            CancellationToken::new(),
        );

        // Round 1: Unknown -> Unhealthy, one transition
        scheduler.run_once().await;
        assert_eq!(sink.transitions.lock().unwrap().len(), 1);
        assert_eq!(store.get("audio").unwrap().consecutive_failures, 1);

        // Round 2: still Unhealthy, no new transition
        scheduler.run_once().await;
        assert_eq!(sink.transitions.lock().unwrap().len(), 1);
        assert_eq!(store.get("audio").unwrap().consecutive_failures, 2);

        // Round 3: back to Healthy, transition emitted, failures reset
        scheduler.run_once().await;
        let transitions = sink.transitions.lock().unwrap();
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[1].from, HealthStatus::Unhealthy);
        assert_eq!(transitions[1].to, HealthStatus::Healthy);
        drop(transitions);
        assert_eq!(store.get("audio").unwrap().consecutive_failures, 0);
        assert_eq!(*sink.rounds.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_recovery_fires_once_within_cooldown() {
        let store = Arc::new(HealthStore::new());
        let sink = Arc::new(RecordingSink::default());
        let scheduler = scheduler_for(
            vec![down(), down(), down(), down()],
            RecoveryPolicy::new(3, Duration::from_secs(60), false),
            store.clone(),
            sink.clone(),
            CancellationToken::new(),
        );

        scheduler.run_once().await;
        scheduler.run_once().await;
        assert_eq!(sink.intents.lock().unwrap().len(), 0);

        // Third consecutive failure crosses the threshold
        scheduler.run_once().await;
        assert_eq!(sink.intents.lock().unwrap().len(), 1);

        // Fourth round lands inside the cooldown
        scheduler.run_once().await;
        assert_eq!(sink.intents.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_on_cancellation() {
        let store = Arc::new(HealthStore::new());
        let sink = Arc::new(RecordingSink::default());
        let shutdown = CancellationToken::new();
        let scheduler = scheduler_for(
            vec![Outcome::Up],
            RecoveryPolicy::new(3, Duration::from_secs(60), false),
            store.clone(),
            sink.clone(),
            shutdown.clone(),
        );

        let handle = tokio::spawn(scheduler.run());

        // First tick fires immediately and announces the initial state
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.transitions.lock().unwrap().len(), 1);

        shutdown.cancel();
        handle.await.unwrap();

        // No further rounds after cancellation
        let rounds = *sink.rounds.lock().unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(*sink.rounds.lock().unwrap(), rounds);
    }
}
