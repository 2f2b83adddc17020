//! Prometheus metrics for billing-tracker.

use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_request_duration: HistogramVec,
    records_inserted: IntCounterVec,
    exports: IntCounterVec,
    store_operation_duration: HistogramVec,
}

impl Metrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            opts!("billing_tracker_http_requests_total", "Total HTTP requests"),
            &["method", "route", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            histogram_opts!(
                "billing_tracker_http_request_duration_seconds",
                "HTTP request duration"
            ),
            &["method", "route"],
        )?;
        let records_inserted = IntCounterVec::new(
            opts!(
                "billing_tracker_records_inserted_total",
                "Billing records inserted by service and entry type"
            ),
            &["service", "entry_type"],
        )?;
        let exports = IntCounterVec::new(
            opts!("billing_tracker_exports_total", "Exports generated by format"),
            &["format"],
        )?;
        // Store round trips are expected well under a second
        let store_operation_duration = HistogramVec::new(
            histogram_opts!(
                "billing_tracker_store_operation_duration_seconds",
                "Store operation duration",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
            ),
            &["operation"],
        )?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(records_inserted.clone()))?;
        registry.register(Box::new(exports.clone()))?;
        registry.register(Box::new(store_operation_duration.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_request_duration,
            records_inserted,
            exports,
            store_operation_duration,
        })
    }
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize all metrics. Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_none() {
        let metrics = Metrics::new()?;
        // A concurrent caller may have won; its instance is kept.
        let _ = METRICS.set(metrics);
    }
    Ok(())
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> Result<String, prometheus::Error> {
    let Some(metrics) = METRICS.get() else {
        return Ok(String::new());
    };
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    if let Some(metrics) = METRICS.get() {
        metrics
            .http_requests
            .with_label_values(&[method, route, &status.to_string()])
            .inc();
        metrics
            .http_request_duration
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }
}

pub fn record_inserted(service: &str, entry_type: &str) {
    if let Some(metrics) = METRICS.get() {
        metrics
            .records_inserted
            .with_label_values(&[service, entry_type])
            .inc();
    }
}

pub fn record_export(format: &str) {
    if let Some(metrics) = METRICS.get() {
        metrics.exports.with_label_values(&[format]).inc();
    }
}

/// Observe a store call that began at `started`.
pub fn record_store_operation(operation: &str, started: Instant) {
    if let Some(metrics) = METRICS.get() {
        metrics
            .store_operation_duration
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }
}
