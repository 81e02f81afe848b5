//! HTTP endpoints: /health, /status, /metrics, and a small dashboard.

use crate::metrics::MetricsRegistry;
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use watchdog::store::HealthStore;
use watchdog::types::HealthStatus;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<HealthStore>,
    pub metrics: Arc<MetricsRegistry>,
}

/// HTTP server exposing the watchdog's read surface.
pub struct HttpServer {
    state: AppState,
    listen_addr: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(store: Arc<HealthStore>, metrics: Arc<MetricsRegistry>, listen_addr: String) -> Self {
        Self {
            state: AppState { store, metrics },
            listen_addr,
        }
    }

    /// Run the HTTP server until the token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> common::Result<()> {
        info!(listen_addr = %self.listen_addr, "starting HTTP server");

        let app = router(self.state);

        let listener = TcpListener::bind(&self.listen_addr).await?;
        info!(listen_addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

/// Build the router; separated for tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Middleware recording the request counter metric.
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let endpoint = request.uri().path().to_string();

    let response = next.run(request).await;

    state
        .metrics
        .record_request(&method, &endpoint, response.status().as_u16());
    response
}

/// Handler for /health: 200 when all tracked services are healthy,
/// 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.store.snapshot();

    let services: BTreeMap<String, String> = snapshot
        .iter()
        .map(|(name, s)| (name.clone(), s.status.to_string()))
        .collect();
    let all_healthy = snapshot
        .values()
        .all(|s| s.status == HealthStatus::Healthy);

    let body = json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "services": services,
    });

    let code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(body)).into_response()
}

/// Handler for /status: full per-service state.
async fn status_handler(State(state): State<AppState>) -> Response {
    let snapshot: BTreeMap<_, _> = state.store.snapshot().into_iter().collect();
    Json(snapshot).into_response()
}

/// Handler for /metrics: Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut buffer = String::new();
    if let Err(e) = encode(&mut buffer, &state.metrics.registry) {
        warn!(error = %e, "failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

/// Handler for /: a minimal status dashboard.
async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Watchdog</title>
  <style>
    body { font-family: monospace; margin: 2em; }
    .healthy { color: #2e7d32; }
    .unhealthy, .error { color: #c62828; }
    .unknown { color: #757575; }
    li { margin: 0.3em 0; }
  </style>
</head>
<body>
  <h1>Watchdog</h1>
  <ul id="services"></ul>
  <p><a href="/health">health</a> | <a href="/status">status</a> | <a href="/metrics">metrics</a></p>
  <script>
    async function refresh() {
      const res = await fetch('/status');
      const services = await res.json();
      const list = document.getElementById('services');
      list.innerHTML = '';
      for (const [name, state] of Object.entries(services)) {
        const li = document.createElement('li');
        li.className = state.status;
        li.textContent = name + ': ' + state.status +
          ' (failures: ' + state.consecutive_failures + ')';
        list.appendChild(li);
      }
    }
    refresh();
    setInterval(refresh, 5000);
  </script>
</body>
</html>
"#;
