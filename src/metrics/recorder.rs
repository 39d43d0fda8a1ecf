use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

// ─── Recorder abstraction ────────────────────────────────────────

/// Per-route latency storage. The monitor only ever asks for the count and
/// the mean, so strategies can trade memory for precision freely.
pub trait SampleRecorder: Send + Sync {
    fn record(&mut self, latency: Duration);

    /// Arithmetic mean of everything recorded so far; zero when empty.
    fn mean(&self) -> Duration;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Percentile breakdown, for recorders that can produce one.
    fn percentiles(&self) -> Option<PercentileSet> {
        None
    }
}

/// Which recorder the monitor builds for each new route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderKind {
    /// Keep every sample. Grows without bound.
    #[default]
    History,
    /// Bounded HdrHistogram; adds percentiles.
    Histogram,
}

impl RecorderKind {
    pub fn build(self) -> Box<dyn SampleRecorder> {
        match self {
            Self::History => Box::new(SampleHistory::default()),
            Self::Histogram => Box::new(HistogramRecorder::new()),
        }
    }
}

// ─── Unbounded history ───────────────────────────────────────────

/// Every sample, in arrival order. The mean is recomputed over the full
/// history on each call.
#[derive(Debug, Default)]
pub struct SampleHistory {
    samples: Vec<Duration>,
}

impl SampleRecorder for SampleHistory {
    fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    fn mean(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: u128 = self.samples.iter().map(Duration::as_nanos).sum();
        let mean = total / self.samples.len() as u128;
        Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    fn len(&self) -> u64 {
        self.samples.len() as u64
    }
}

// ─── Bounded histogram ───────────────────────────────────────────

/// Fixed-size HdrHistogram in microseconds plus an exact running sum, so the
/// mean stays exact while memory stays constant.
pub struct HistogramRecorder {
    hist: Option<Histogram<u64>>,
    sum_nanos: u128,
    count: u64,
}

impl HistogramRecorder {
    pub fn new() -> Self {
        let hist = match Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = %e, "histogram creation failed, percentiles disabled");
                None
            }
        };
        Self {
            hist,
            sum_nanos: 0,
            count: 0,
        }
    }
}

impl Default for HistogramRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRecorder for HistogramRecorder {
    fn record(&mut self, latency: Duration) {
        self.sum_nanos += latency.as_nanos();
        self.count += 1;
        if let Some(hist) = &mut self.hist {
            // Clamp into the tracked range (≥ 1 μs, ≤ 60 s)
            let us = u64::try_from(latency.as_micros())
                .unwrap_or(HIST_HIGH)
                .clamp(HIST_LOW, HIST_HIGH);
            let _ = hist.record(us);
        }
    }

    fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let mean = self.sum_nanos / u128::from(self.count);
        Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX))
    }

    fn len(&self) -> u64 {
        self.count
    }

    fn percentiles(&self) -> Option<PercentileSet> {
        self.hist.as_ref().map(PercentileSet::from_histogram)
    }
}

// ─── Percentiles ─────────────────────────────────────────────────

/// A complete percentile breakdown for one route, in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Extract a full percentile set from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min: hist.min(),
            max: hist.max(),
            mean: hist.mean(),
            p50: hist.value_at_percentile(50.0),
            p95: hist.value_at_percentile(95.0),
            p99: hist.value_at_percentile(99.0),
            p999: hist.value_at_percentile(99.9),
            count: hist.len(),
        }
    }

    pub fn empty() -> Self {
        Self {
            min: 0,
            max: 0,
            mean: 0.0,
            p50: 0,
            p95: 0,
            p99: 0,
            p999: 0,
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn history_mean_is_arithmetic_mean() {
        let mut rec = SampleHistory::default();
        assert_eq!(rec.mean(), Duration::ZERO);
        assert!(rec.is_empty());

        for l in [100, 200, 300] {
            rec.record(ms(l));
        }
        assert_eq!(rec.mean(), ms(200));
        assert_eq!(rec.len(), 3);
        assert!(rec.percentiles().is_none());
    }

    #[test]
    fn histogram_mean_is_exact_and_percentiles_present() {
        let mut rec = HistogramRecorder::new();
        for l in [100, 200, 300] {
            rec.record(ms(l));
        }
        assert_eq!(rec.mean(), ms(200));
        assert_eq!(rec.len(), 3);

        let p = rec.percentiles().unwrap();
        assert_eq!(p.count, 3);
        assert!(p.max >= 299_000 && p.max <= 301_000);
    }

    #[test]
    fn histogram_clamps_out_of_range_samples() {
        let mut rec = HistogramRecorder::new();
        rec.record(Duration::from_nanos(10));
        rec.record(Duration::from_secs(120));
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.percentiles().unwrap().count, 2);
    }

    #[test]
    fn kind_builds_matching_recorder() {
        assert!(RecorderKind::History.build().percentiles().is_none());
        assert!(RecorderKind::Histogram.build().percentiles().is_some());
    }
}
