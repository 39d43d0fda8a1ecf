use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::recorder::{RecorderKind, SampleRecorder};
use super::snapshot::{format_uptime, ErrorDistribution, RouteStat, StatsSnapshot};
use crate::events::{self, Event, EventBus, SubscriptionId};
use crate::middleware::lifecycle::RequestEvent;

type RecorderFactory = Box<dyn Fn() -> Box<dyn SampleRecorder> + Send + Sync>;

/// Thread-safe request/error aggregator fed by lifecycle events.
///
/// Every write takes the exclusive lock; `stats()` takes the shared lock, so a
/// snapshot is never torn. Counters only ever grow.
pub struct Monitor {
    inner: RwLock<Inner>,
    started_at: Instant,
    new_recorder: RecorderFactory,
    route_key: RouteKey,
}

/// How requests are grouped into per-route buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKey {
    /// `"GET /api/v1/users/7"`.
    #[default]
    Path,
    /// `"GET /api/v1/users/:id"`.
    Pattern,
}

// ─── Internal state ──────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    request_count: u64,
    error_count: u64,
    routes: HashMap<String, RouteAggregate>,
    errors_by_status: HashMap<u16, u64>,
}

struct RouteAggregate {
    count: u64,
    samples: Box<dyn SampleRecorder>,
    avg: Duration,
}

// ─── Monitor impl ────────────────────────────────────────────────

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    /// Monitor keeping the full latency history per route.
    pub fn new() -> Self {
        Self::with_recorder(RecorderKind::History)
    }

    pub fn with_recorder(kind: RecorderKind) -> Self {
        Self::with_recorder_factory(move || kind.build())
    }

    /// Plug in any per-route sample strategy.
    pub fn with_recorder_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn SampleRecorder> + Send + Sync + 'static,
    {
        Self {
            inner: RwLock::new(Inner::default()),
            started_at: Instant::now(),
            new_recorder: Box::new(factory),
            route_key: RouteKey::default(),
        }
    }

    pub fn with_route_key(mut self, route_key: RouteKey) -> Self {
        self.route_key = route_key;
        self
    }

    /// Subscribe this monitor to the lifecycle events it aggregates.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Vec<SubscriptionId> {
        let mut ids = Vec::with_capacity(5);

        let monitor = Arc::clone(self);
        ids.push(bus.subscribe(events::REQUEST_COMPLETE, move |e: &Event| {
            if let Some(payload) = e.payload::<RequestEvent>() {
                monitor.record_request(payload);
            }
        }));

        let monitor = Arc::clone(self);
        ids.push(bus.subscribe(events::REQUEST_ERROR, move |e: &Event| {
            if let Some(payload) = e.payload::<RequestEvent>() {
                monitor.record_error(payload);
            }
        }));

        let monitor = Arc::clone(self);
        ids.push(bus.subscribe(events::DATABASE_ERROR, move |e: &Event| {
            monitor.record_system_error();
            tracing::warn!(details = ?e.payload::<serde_json::Value>(), "database error detected by monitor");
        }));

        ids.push(bus.subscribe(events::AUTH_FAILED, |e: &Event| {
            if let Some(p) = e.payload::<RequestEvent>() {
                tracing::warn!(ip = %p.client_ip, path = %p.path, request_id = %p.request_id, "authentication failed");
            }
        }));

        ids.push(bus.subscribe(events::RATE_LIMITED, |e: &Event| {
            if let Some(p) = e.payload::<RequestEvent>() {
                tracing::warn!(ip = %p.client_ip, path = %p.path, request_id = %p.request_id, "rate limited");
            }
        }));

        ids
    }

    /// Count one finished request and fold its latency into the route's
    /// average.
    pub fn record_request(&self, payload: &RequestEvent) {
        let route = match self.route_key {
            RouteKey::Path => payload.route_key(),
            RouteKey::Pattern => payload.pattern_key(),
        };
        self.record_latency(route, payload.latency);
    }

    /// Lower-level form of [`record_request`](Self::record_request).
    pub fn record_latency(&self, route: String, latency: Duration) {
        let mut inner = self.inner.write();
        inner.request_count += 1;

        let agg = inner.routes.entry(route).or_insert_with(|| RouteAggregate {
            count: 0,
            samples: (self.new_recorder)(),
            avg: Duration::ZERO,
        });
        agg.count += 1;
        agg.samples.record(latency);
        agg.avg = agg.samples.mean();
    }

    /// Count one failed request, bucketed by its status code.
    pub fn record_error(&self, payload: &RequestEvent) {
        self.record_status_error(payload.status.unwrap_or(0));
    }

    pub fn record_status_error(&self, status: u16) {
        let mut inner = self.inner.write();
        inner.error_count += 1;
        *inner.errors_by_status.entry(status).or_insert(0) += 1;
    }

    /// Errors with no HTTP status (e.g. a storage failure) only bump the
    /// total.
    pub fn record_system_error(&self) {
        self.inner.write().error_count += 1;
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Consistent snapshot of everything recorded so far.
    pub fn stats(&self) -> StatsSnapshot {
        let uptime = self.uptime();
        let inner = self.inner.read();

        let mut routes: Vec<RouteStat> = inner
            .routes
            .iter()
            .map(|(route, agg)| RouteStat {
                route: route.clone(),
                count: agg.count,
                avg_time_ms: agg.avg.as_secs_f64() * 1000.0,
                latency_us: agg.samples.percentiles(),
            })
            .collect();
        routes.sort_by(|a, b| a.route.cmp(&b.route));

        let mut error_distribution = ErrorDistribution::default();
        for (&status, &count) in &inner.errors_by_status {
            if status >= 500 {
                error_distribution.server_errors += count;
            } else if status >= 400 {
                error_distribution.client_errors += count;
            }
        }

        StatsSnapshot {
            uptime: format_uptime(uptime),
            uptime_secs: uptime.as_secs(),
            total_requests: inner.request_count,
            error_count: inner.error_count,
            error_rate: error_rate(inner.error_count, inner.request_count),
            routes,
            error_distribution,
            timestamp: Utc::now(),
        }
    }
}

/// Percentage with a `+1` in the denominator, so zero requests gives `0`.
pub fn error_rate(errors: u64, requests: u64) -> f64 {
    errors as f64 / (requests + 1) as f64 * 100.0
}
