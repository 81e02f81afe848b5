//! Health-reconciliation engine for the watchdog.
//!
//! Periodically probes a fixed set of services, tracks a per-service
//! health state machine, and reports boundary crossings:
//!
//! - **Prober**: one health check against one service (HTTP GET or
//!   container-state lookup), bounded by a timeout.
//! - **HealthStore**: in-memory service -> state mapping; `apply` folds a
//!   probe outcome into the state machine and emits a [`Transition`] only
//!   on a status change.
//! - **Reconciler**: fans probes out concurrently per round and joins on
//!   all outcomes before applying them.
//! - **Scheduler**: fires rounds at a fixed interval until cancelled and
//!   hands transitions and recovery intents to injected sinks.
//! - **RecoveryPolicy**: debounced restart-intent decisions from
//!   accumulated unhealthy state.
//!
//! # Example
//!
//! ```no_run
//! use watchdog::{HealthStore, Reconciler, ServiceSpec};
//! use watchdog::prober::{HttpProber, Prober};
//! use std::sync::Arc;
//! use std::time::{Duration, SystemTime};
//!
//! # async fn example() {
//! let store = Arc::new(HealthStore::new());
//! let spec = ServiceSpec::http("backend", "http://localhost:8000/health");
//! let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(
//!     "http://localhost:8000/health".to_string(),
//!     None,
//!     Duration::from_secs(10),
//!     reqwest::Client::new(),
//! ));
//!
//! let reconciler = Reconciler::new(vec![(spec, prober)], store.clone(), Duration::from_secs(10));
//! let transitions = reconciler.run_round(SystemTime::now()).await;
//! # }
//! ```

pub mod prober;
pub mod reconciler;
pub mod recovery;
pub mod scheduler;
pub mod store;
pub mod types;

pub use prober::{ContainerProber, ContainerRuntime, HttpProber, Prober};
pub use reconciler::Reconciler;
pub use recovery::RecoveryPolicy;
pub use scheduler::{RecoverySink, Scheduler, TransitionSink};
pub use store::HealthStore;
pub use types::{
    HealthState, HealthStatus, Outcome, ProbeFailure, ProbeTarget, RecoveryIntent, ServiceSpec,
    Transition,
};
