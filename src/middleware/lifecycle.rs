//! HTTP lifecycle emitter.
//!
//! Wraps each request and publishes `http.request_started` on entry, then on
//! exit `http.request_error` (if the handler chain recorded an error),
//! `http.auth_failed` (401), `http.rate_limited` (429) and finally
//! `http.request_complete`. Publishing is fire-and-forget, so none of this
//! delays the response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::auth::CallerIdentity;
use super::request_id::RequestId;
use crate::config::EventsSection;
use crate::error::RecordedError;
use crate::events::{self, Event, EventBus};

/// Payload of every `http.*` event. Immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    pub method: String,
    /// Raw request path.
    pub path: String,
    /// Matched route pattern, e.g. `/api/v1/users/:id`.
    pub route: Option<String>,
    /// Absent on `http.request_started`.
    pub status: Option<u16>,
    pub request_id: String,
    pub user_id: Option<String>,
    pub client_ip: String,
    /// Zero on `http.request_started`.
    #[serde(serialize_with = "serialize_ms")]
    pub latency: Duration,
    pub error: Option<String>,
    /// When the request arrived.
    pub timestamp: DateTime<Utc>,
}

impl RequestEvent {
    /// `"METHOD PATH"` on the raw request path.
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// `"METHOD PATTERN"`, so `/users/1` and `/users/2` share a key. Falls
    /// back to the raw path when no route matched.
    pub fn pattern_key(&self) -> String {
        let path = self.route.as_deref().unwrap_or(&self.path);
        format!("{} {path}", self.method)
    }
}

fn serialize_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Emitter configuration plus the bus it publishes to.
pub struct LifecycleEmitter {
    bus: Arc<EventBus>,
    exempt_paths: Vec<String>,
    slow_request: Duration,
}

impl LifecycleEmitter {
    pub fn new(bus: Arc<EventBus>, cfg: &EventsSection) -> Self {
        Self {
            bus,
            exempt_paths: cfg.exempt_paths.clone(),
            slow_request: cfg.slow_request(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// Publish the exit-side events for one finished request.
    fn finish(&self, payload: RequestEvent) {
        let status = payload.status.unwrap_or(0);

        if payload.error.is_some() {
            self.bus
                .publish(Event::new(events::REQUEST_ERROR, payload.clone()));
        }
        match StatusCode::from_u16(status) {
            Ok(StatusCode::UNAUTHORIZED) => {
                self.bus.publish(Event::new(events::AUTH_FAILED, payload.clone()));
            }
            Ok(StatusCode::TOO_MANY_REQUESTS) => {
                self.bus.publish(Event::new(events::RATE_LIMITED, payload.clone()));
            }
            _ => {}
        }

        if payload.latency > self.slow_request {
            tracing::warn!(
                request_id = %payload.request_id,
                method = %payload.method,
                path = %payload.path,
                status,
                latency_ms = payload.latency.as_millis() as u64,
                "slow request"
            );
        }

        self.bus.publish(Event::new(events::REQUEST_COMPLETE, payload));
    }
}

/// Middleware entry point; install with `from_fn_with_state`.
pub async fn emit_lifecycle(
    State(emitter): State<Arc<LifecycleEmitter>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if emitter.is_exempt(&path) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let timestamp = Utc::now();
    let method = req.method().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let inbound_user = req.extensions().get::<CallerIdentity>().map(|c| c.0.clone());
    let client_ip = client_ip(&req);
    let route = matched_route(&req);

    let started = RequestEvent {
        method,
        path,
        route,
        status: None,
        request_id,
        user_id: inbound_user,
        client_ip,
        latency: Duration::ZERO,
        error: None,
        timestamp,
    };
    emitter
        .bus
        .publish(Event::new(events::REQUEST_STARTED, started.clone()));

    let response = next.run(req).await;

    let user_id = response
        .extensions()
        .get::<CallerIdentity>()
        .map(|c| c.0.clone())
        .or(started.user_id.clone());
    let error = response.extensions().get::<RecordedError>().map(|e| e.0.clone());

    emitter.finish(RequestEvent {
        status: Some(response.status().as_u16()),
        user_id,
        latency: start.elapsed(),
        error,
        ..started
    });

    response
}

/// Route pattern (`/api/v1/users/:id`) when the router matched one.
pub fn matched_route(req: &Request) -> Option<String> {
    req.extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
pub fn client_ip(req: &Request) -> String {
    forwarded_ip(req.headers())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".into())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    first_hop.or_else(real_ip).map(str::to_owned)
}
