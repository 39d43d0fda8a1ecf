use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::monitor::Monitor;
use super::snapshot::SystemMetrics;
use crate::events::{self, Event, EventBus};

/// Default reporting cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that logs a [`SystemMetrics`] snapshot on a fixed
/// interval and republishes it as `system.metrics`.
pub struct Reporter {
    monitor: Arc<Monitor>,
    bus: Arc<EventBus>,
    interval: Duration,
}

impl Reporter {
    pub fn new(monitor: Arc<Monitor>, bus: Arc<EventBus>, interval: Duration) -> Self {
        Self {
            monitor,
            bus,
            interval,
        }
    }

    /// Start ticking. The first report lands one full interval from now; the
    /// task runs until it is aborted or the runtime shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            // A failed tick is logged and skipped; the next one still runs.
            if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| self.tick())) {
                let msg = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                tracing::error!(error = %msg, "metrics report failed");
            }
        }
    }

    /// Capture, log and publish one report.
    pub fn tick(&self) -> SystemMetrics {
        let report = SystemMetrics::capture(self.monitor.stats());

        tracing::info!(
            uptime = %report.stats.uptime,
            active_tasks = ?report.active_tasks,
            memory_used_mb = ?report.memory_used_mb,
            total_requests = report.stats.total_requests,
            error_count = report.stats.error_count,
            error_rate = report.stats.error_rate,
            "system metrics"
        );

        self.bus
            .publish(Event::new(events::SYSTEM_METRICS, report.clone()));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn publishes_system_metrics_every_interval() {
        let bus = Arc::new(EventBus::new());
        let monitor = Arc::new(Monitor::new());
        monitor.record_latency("GET /a".into(), Duration::from_millis(5));

        let seen = Arc::new(Mutex::new(Vec::<u64>::new()));
        let s = Arc::clone(&seen);
        bus.subscribe(events::SYSTEM_METRICS, move |e: &Event| {
            if let Some(m) = e.payload::<SystemMetrics>() {
                s.lock().push(m.stats.total_requests);
            }
        });

        let handle = Reporter::new(Arc::clone(&monitor), Arc::clone(&bus), Duration::from_secs(60)).spawn();

        // Nothing before the first interval elapses
        time::sleep(Duration::from_secs(59)).await;
        assert!(seen.lock().is_empty());

        time::sleep(Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        time::sleep(Duration::from_secs(60)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        handle.abort();
        assert_eq!(*seen.lock(), vec![1, 1]);
    }

    #[tokio::test]
    async fn tick_returns_report() {
        let bus = Arc::new(EventBus::new());
        let monitor = Arc::new(Monitor::new());
        monitor.record_status_error(503);

        let report = Reporter::new(monitor, bus, DEFAULT_INTERVAL).tick();
        assert_eq!(report.stats.error_count, 1);
        assert_eq!(report.stats.error_rate, 100.0);
        assert!(report.active_tasks.is_some());
    }
}
