use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::snapshot::{ErrorDistribution, RouteStat, StatsSnapshot, SystemMetrics};
use crate::response::{ok, ApiResult};
use crate::AppState;

// ─── GET /metrics ────────────────────────────────────────────────
/// Full monitor snapshot. Exempt from lifecycle events by default.

pub async fn get_snapshot(State(state): State<Arc<AppState>>) -> ApiResult<StatsSnapshot> {
    ok(state.monitor.stats())
}

// ─── GET /api/v1/admin/metrics ───────────────────────────────────
/// Top-level figures plus process gauges.

#[derive(Debug, Serialize)]
pub struct Overview {
    pub uptime: String,
    pub total_requests: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub active_tasks: Option<usize>,
    pub memory_used_mb: Option<u64>,
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> ApiResult<Overview> {
    let report = SystemMetrics::capture(state.monitor.stats());
    ok(Overview {
        uptime: report.stats.uptime,
        total_requests: report.stats.total_requests,
        error_count: report.stats.error_count,
        error_rate: report.stats.error_rate,
        active_tasks: report.active_tasks,
        memory_used_mb: report.memory_used_mb,
    })
}

// ─── GET /api/v1/admin/metrics/routes ────────────────────────────

#[derive(Debug, Serialize)]
pub struct RouteMetrics {
    pub routes: Vec<RouteStat>,
}

pub async fn get_route_metrics(State(state): State<Arc<AppState>>) -> ApiResult<RouteMetrics> {
    ok(RouteMetrics {
        routes: state.monitor.stats().routes,
    })
}

// ─── GET /api/v1/admin/metrics/errors ────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorMetrics {
    pub error_distribution: ErrorDistribution,
    pub error_count: u64,
    pub error_rate: f64,
}

pub async fn get_error_metrics(State(state): State<Arc<AppState>>) -> ApiResult<ErrorMetrics> {
    let stats = state.monitor.stats();
    ok(ErrorMetrics {
        error_distribution: stats.error_distribution,
        error_count: stats.error_count,
        error_rate: stats.error_rate,
    })
}

// ─── GET /api/v1/admin/metrics/stream ────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a full `StatsSnapshot` as JSON every 500 ms.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.monitor.stats();
        let data = serde_json::to_string(&snapshot)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
        Ok(Event::default().event("metrics").data(data))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
