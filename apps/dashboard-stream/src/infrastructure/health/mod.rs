//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint reporting how each adapter subscription is delivering
//! values, plus Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status with every adapter's mode
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (some adapter is delivering)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::connection::ConnectionMode;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Registered adapter subscriptions.
    pub adapters: Vec<AdapterInfo>,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every adapter is streaming.
    Healthy,
    /// Some adapter is polling or reconnecting.
    Degraded,
    /// Nothing is delivering.
    Unhealthy,
}

/// One adapter subscription's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterInfo {
    /// Registered name.
    pub name: String,
    /// Current delivery mode.
    pub mode: ConnectionMode,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    adapters: RwLock<Vec<(String, watch::Receiver<ConnectionMode>)>>,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(version: String) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            adapters: RwLock::new(Vec::new()),
        }
    }

    /// Report `mode` under `name`.
    pub fn register(&self, name: impl Into<String>, mode: watch::Receiver<ConnectionMode>) {
        self.adapters.write().push((name.into(), mode));
    }

    /// Current status of every registered adapter.
    #[must_use]
    pub fn adapters(&self) -> Vec<AdapterInfo> {
        self.adapters
            .read()
            .iter()
            .map(|(name, mode)| AdapterInfo {
                name: name.clone(),
                mode: *mode.borrow(),
            })
            .collect()
    }
}

impl std::fmt::Debug for HealthServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthServerState")
            .field("version", &self.version)
            .field("adapters", &self.adapters())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError::ServerFailed` if the HTTP server fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HealthServerError> {
        let app = router(self.state);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "Health server listening");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let is_ready = state
        .adapters()
        .iter()
        .any(|adapter| adapter.mode != ConnectionMode::Disconnected);

    if is_ready {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let adapters = state.adapters();
    let modes: Vec<ConnectionMode> = adapters.iter().map(|adapter| adapter.mode).collect();

    HealthResponse {
        status: determine_health_status(&modes),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        adapters,
    }
}

fn determine_health_status(modes: &[ConnectionMode]) -> HealthStatus {
    if modes.iter().all(|&mode| mode == ConnectionMode::Disconnected) {
        HealthStatus::Unhealthy
    } else if modes.iter().all(|&mode| mode == ConnectionMode::Streaming) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
