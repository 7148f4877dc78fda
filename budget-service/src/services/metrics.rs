//! Metrics collection and Prometheus export.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder. Call once at startup, before any metric is
/// recorded.
pub fn init_metrics() -> Result<(), BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    // A second install would already have failed above.
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_request_outcome(outcome: &'static str) {
    counter!("budget_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_attachment(disposition: &'static str) {
    counter!("budget_attachments_total", "disposition" => disposition).increment(1);
}
