use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::request_id::RequestId;

/// Logs one line per request and adds two response headers:
///
///   X-Response-Time-Us: total handler wall time in microseconds
///   Server-Timing: same value in the standard Server-Timing format
///
/// 5xx log at error, 4xx at warn, everything else at info.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = match req.uri().query() {
        Some(q) => format!("{}?{q}", req.uri().path()),
        None => req.uri().path().to_owned(),
    };
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let client_ip = super::lifecycle::client_ip(&req);

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Structured log line ─────────────────────────────────────
    let status = response.status().as_u16();
    let error = response
        .extensions()
        .get::<crate::error::RecordedError>()
        .map(|e| e.0.as_str());

    match status {
        500.. => tracing::error!(%request_id, status, latency_us = us as u64, %client_ip, %method, %path, error, "http request"),
        400..=499 => tracing::warn!(%request_id, status, latency_us = us as u64, %client_ip, %method, %path, error, "http request"),
        _ => tracing::info!(%request_id, status, latency_us = us as u64, %client_ip, %method, %path, "http request"),
    }

    response
}
