//! HTTP API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::scan::{ScanStats, StatsSnapshot};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Scan statistics, shared with the scheduler.
    pub stats: Arc<ScanStats>,
    /// Prometheus render handle; `/metrics` is empty without one.
    pub prometheus: Option<PrometheusHandle>,
    /// Reference site identifier.
    pub reference_site: String,
    /// Comparator site identifier.
    pub comparator_site: String,
}

impl AppState {
    /// Create new app state around shared statistics.
    pub fn new(stats: Arc<ScanStats>) -> Self {
        Self {
            stats,
            prometheus: None,
            reference_site: String::new(),
            comparator_site: String::new(),
        }
    }

    /// Attach the Prometheus handle.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Name the scanned sites.
    pub fn with_sites(mut self, reference: &str, comparator: &str) -> Self {
        self.reference_site = reference.to_string();
        self.comparator_site = comparator.to_string();
        self
    }

    /// Ready once a cycle has completed.
    pub fn is_ready(&self) -> bool {
        self.stats.cycles_completed() > 0
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Completed cycles so far.
    pub cycles_completed: u64,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// "running" after the first completed cycle, "starting" before.
    pub status: &'static str,
    /// Reference site identifier.
    pub reference_site: String,
    /// Comparator site identifier.
    pub comparator_site: String,
    /// Statistics.
    pub stats: StatsSnapshot,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        cycles_completed: state.stats.cycles_completed(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns scan statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        reference_site: state.reference_site.clone(),
        comparator_site: state.comparator_site.clone(),
        stats: state.stats.snapshot().await,
    })
}

/// Prometheus exposition handler.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .prometheus
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}
