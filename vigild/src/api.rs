//! HTTP read path plus alert resolution.
//!
//! Everything under /api/monitoring is served from either live probes or the
//! store; handlers hold no state of their own.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::collectors::{HostCollector, PostgresCollector};
use crate::metrics::Metrics;
use crate::store::MonitorStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MonitorStore>,
    pub host: Arc<HostCollector>,
    pub postgres: Arc<PostgresCollector>,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/monitoring/current", get(current_stats))
        .route("/api/monitoring/history", get(history))
        .route("/api/monitoring/processes", get(processes))
        .route("/api/monitoring/connections", get(connections))
        .route(
            "/api/monitoring/connections/by-service",
            get(connections_by_service),
        )
        .route("/api/monitoring/services", get(services))
        .route("/api/monitoring/traffic", get(traffic))
        .route("/api/monitoring/alerts", get(alerts))
        .route("/api/monitoring/alerts/{id}/resolve", post(resolve_alert))
        .route("/api/monitoring/postgres/stats", get(postgres_stats))
        .route(
            "/api/monitoring/postgres/connections",
            get(postgres_connections),
        )
        .route("/api/monitoring/postgres/health", get(postgres_health))
        .route("/api/monitoring/status", get(status))
        .with_state(state)
}

/// Store failures surface as a JSON 500; probe failures never get here
/// because the collectors degrade instead of erroring.
struct ApiError(sqlx::Error);

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("[api] request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn current_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.host.server_stats().await)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(60).clamp(1, 1000);
    Ok(Json(state.store.recent_stats(limit).await?))
}

#[derive(Debug, Deserialize)]
struct ProcessQuery {
    count: Option<usize>,
}

async fn processes(
    State(state): State<AppState>,
    Query(params): Query<ProcessQuery>,
) -> impl IntoResponse {
    let count = params
        .count
        .unwrap_or_else(|| state.host.default_process_count());
    Json(state.host.top_processes(count).await)
}

async fn connections(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.host.network_connections().await)
}

async fn connections_by_service(State(state): State<AppState>) -> impl IntoResponse {
    let mut by_service: BTreeMap<&'static str, usize> = BTreeMap::new();
    for conn in state.host.network_connections().await {
        *by_service.entry(conn.service.label()).or_default() += 1;
    }
    Json(by_service)
}

async fn services(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.host.service_status().await)
}

async fn traffic(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.host.service_traffic().await)
}

#[derive(Debug, Deserialize)]
struct AlertsQuery {
    include_resolved: Option<bool>,
    limit: Option<i64>,
}

async fn alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);
    let alerts = state
        .store
        .alerts(params.include_resolved.unwrap_or(false), limit)
        .await?;
    Ok(Json(alerts))
}

async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    if state.store.resolve_alert(id).await? {
        Ok(Json(json!({ "resolved": id })).into_response())
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "alert not found or already resolved" })),
        )
            .into_response())
    }
}

async fn postgres_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.postgres.stats().await)
}

async fn postgres_connections(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.postgres.active_connections().await)
}

async fn postgres_health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.postgres.healthy().await;
    Json(json!({ "healthy": healthy }))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
