//! # Meridian Metrics
//!
//! An abstract observability seam. The engine reports counters and latency
//! histograms through the `MetricsSink` trait; which backend (if any) records
//! them is the embedder's choice. Emission is fire-and-forget: a sink must
//! never block or fail the trading path.

use std::sync::Arc;

/// A shared handle to whatever sink the application wired up.
pub type SharedMetrics = Arc<dyn MetricsSink>;

/// The capability the engine uses to report operational metrics.
pub trait MetricsSink: Send + Sync {
    /// Increments a named counter.
    fn record_counter(&self, name: &'static str, value: u64, labels: &[(&'static str, &str)]);

    /// Records one observation of a named distribution (e.g. a latency in
    /// milliseconds).
    fn observe_histogram(&self, name: &'static str, value: f64, labels: &[(&'static str, &str)]);
}

/// The default sink: discards everything, but leaves a trace-level breadcrumb
/// so the emission sites remain debuggable without a backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_counter(&self, name: &'static str, value: u64, labels: &[(&'static str, &str)]) {
        tracing::trace!(metric = name, value, ?labels, "counter");
    }

    fn observe_histogram(&self, name: &'static str, value: f64, labels: &[(&'static str, &str)]) {
        tracing::trace!(metric = name, value, ?labels, "histogram");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// A sink that remembers what it saw, for asserting emission sites.
    #[derive(Default)]
    pub struct RecordingSink {
        pub counters: Mutex<Vec<(&'static str, u64)>>,
    }

    impl MetricsSink for RecordingSink {
        fn record_counter(&self, name: &'static str, value: u64, _labels: &[(&'static str, &str)]) {
            self.counters.lock().unwrap().push((name, value));
        }

        fn observe_histogram(&self, _: &'static str, _: f64, _: &[(&'static str, &str)]) {}
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let sink = NoopSink;
        sink.record_counter("signals_total", 1, &[("symbol", "BTCUSDT")]);
        sink.observe_histogram("submit_latency_ms", 12.5, &[]);
    }

    #[test]
    fn sinks_are_object_safe() {
        let sink: SharedMetrics = Arc::new(RecordingSink::default());
        sink.record_counter("fills_total", 1, &[]);
    }
}
