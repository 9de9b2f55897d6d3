//! Controller metrics
//!
//! Reconciliation counters and durations, labeled by the event kind that
//! triggered the cycle.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Controller metrics registry
    pub static ref CONTROLLER_METRICS_REGISTRY: Registry = Registry::new();

    /// Reconciliation duration per triggering event kind
    static ref RECONCILIATION_DURATION: HistogramVec = {
        let opts = HistogramOpts::new(
            "reconciliation_duration_seconds",
            "Reconciliation duration in seconds",
        );
        let histogram = HistogramVec::new(opts, &["kind"]).unwrap_or_else(|e| {
            eprintln!("WARN: Failed to create reconciliation_duration histogram: {}", e);
            HistogramVec::new(HistogramOpts::new("dummy", "dummy"), &["kind"]).unwrap()
        });
        if let Err(e) = CONTROLLER_METRICS_REGISTRY.register(Box::new(histogram.clone())) {
            eprintln!("WARN: Failed to register reconciliation_duration histogram: {}", e);
            eprintln!("WARN: Metrics collection will be degraded but the controller will continue");
        }
        histogram
    };

    /// Reconciliations total per triggering event kind and result
    static ref RECONCILIATIONS_TOTAL: IntCounterVec = {
        let opts = Opts::new(
            "reconciliations_total",
            "Total number of reconciliations",
        );
        let counter = IntCounterVec::new(opts, &["kind", "result"]).unwrap_or_else(|e| {
            eprintln!("WARN: Failed to create reconciliations_total counter: {}", e);
            IntCounterVec::new(Opts::new("dummy", "dummy"), &["kind", "result"]).unwrap()
        });
        if let Err(e) = CONTROLLER_METRICS_REGISTRY.register(Box::new(counter.clone())) {
            eprintln!("WARN: Failed to register reconciliations_total counter: {}", e);
            eprintln!("WARN: Metrics collection will be degraded but the controller will continue");
        }
        counter
    };
}

/// Record one reconciliation cycle.
pub fn record_reconciliation(kind: &str, duration_secs: f64, result: &str) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration_secs);

    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, result])
        .inc();
}

/// Gather controller metrics in Prometheus text format.
pub fn gather_controller_metrics() -> Result<String, String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = CONTROLLER_METRICS_REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert to UTF-8: {}", e))
}
