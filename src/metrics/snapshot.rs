use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::recorder::PercentileSet;

/// Point-in-time copy of the monitor's aggregates. Owns all of its data, so
/// it can be handed out and serialized without further locking.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Rounded to whole seconds, e.g. `"1h2m3s"`.
    pub uptime: String,
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub error_count: u64,
    /// `error_count / (total_requests + 1) * 100`
    pub error_rate: f64,
    pub routes: Vec<RouteStat>,
    pub error_distribution: ErrorDistribution,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStat {
    /// `"METHOD PATH"`
    pub route: String,
    pub count: u64,
    pub avg_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_us: Option<PercentileSet>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorDistribution {
    /// Status ≥ 500
    pub server_errors: u64,
    /// Status 400–499
    pub client_errors: u64,
}

/// Snapshot plus process-level gauges, logged and published as
/// `system.metrics` once per reporting interval.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    /// Tasks alive on the tokio runtime, if one is running.
    pub active_tasks: Option<usize>,
    pub worker_threads: Option<usize>,
    /// Resident memory, when the platform reports it.
    pub memory_used_mb: Option<u64>,
}

impl SystemMetrics {
    pub fn capture(stats: StatsSnapshot) -> Self {
        let (active_tasks, worker_threads) = match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let m = rt.metrics();
                (Some(m.num_alive_tasks()), Some(m.num_workers()))
            }
            Err(_) => (None, None),
        };
        let memory_used_mb =
            memory_stats::memory_stats().map(|m| (m.physical_mem / 1024 / 1024) as u64);

        Self {
            stats,
            active_tasks,
            worker_threads,
            memory_used_mb,
        }
    }
}

/// Render a duration rounded to the nearest second as `1h2m3s` / `2m5s` /
/// `45s`, zero components kept once a larger unit is present.
pub fn format_uptime(d: Duration) -> String {
    let mut secs = d.as_secs();
    if d.subsec_millis() >= 500 {
        secs += 1;
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
