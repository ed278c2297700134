use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Stage name for image decoding.
pub const STAGE_DECODE: &str = "decode";
/// Stage name for face localization.
pub const STAGE_LOCATE: &str = "locate";
/// Stage name for classifying every face of one frame.
pub const STAGE_CLASSIFY: &str = "classify";
/// Metric name for faces found per frame.
pub const METRIC_FACES: &str = "faces";

/// Cross-cutting observer for pipeline stage timings and metrics.
///
/// Shared by every concurrent run of a pipeline, so methods take `&self`.
/// Observing never changes what the pipeline returns.
pub trait PipelineLogger: Send + Sync {
    /// Record how long a named pipeline stage took for one frame.
    fn timing(&self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&self, name: &str, value: f64);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&self, _stage: &str, _duration_ms: f64) {}
    fn metric(&self, _name: &str, _value: f64) {}
}

/// Count and sum of one recorded series. Constant size however long the run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStat {
    count: u64,
    total: f64,
}

impl RunningStat {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

#[derive(Default)]
struct Stats {
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
}

/// Collects per-stage timings and metrics and reports them through `log`
/// when the host is done.
pub struct StatsPipelineLogger {
    stats: Mutex<Stats>,
    start_time: Instant,
}

impl StatsPipelineLogger {
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(Stats::default()),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        let stats = self.lock();
        if stats.timings.is_empty() && stats.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = stats.timings.get(STAGE_DECODE).map_or(0, RunningStat::count);
        let mut lines = Vec::new();

        lines.push(format!(
            "Pipeline summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = stats.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = stats.timings[stage];
            let total_ms = durations.total();
            let avg_ms = durations.mean();
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:7.1}ms  total {total_ms:8.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = stats.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = stats.metrics[name];
            lines.push(format!(
                "  {name}: avg {:.1}  total {:.0}",
                values.mean(),
                values.total()
            ));
        }

        Some(lines.join("\n"))
    }

    /// Returns the aggregated timings for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.lock().timings.get(stage).copied()
    }

    /// Returns the aggregated values for a given metric.
    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.lock().metrics.get(name).copied()
    }

    fn lock(&self) -> MutexGuard<'_, Stats> {
        // Stats stay usable even if a recording thread panicked.
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatsPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StatsPipelineLogger {
    fn timing(&self, stage: &str, duration_ms: f64) {
        self.lock()
            .timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&self, name: &str, value: f64) {
        self.lock()
            .metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
