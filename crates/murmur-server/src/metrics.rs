//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded; a
/// second call (tests) falls back to a detached recorder.
#[must_use]
pub fn install_recorder() -> PrometheusHandle {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("prometheus metrics recorder installed");
            handle
        }
        Err(_) => PrometheusBuilder::new().build_recorder().handle(),
    }
}

// Metric name constants to avoid typos across modules.

/// HTTP requests total (counter, labels: class).
pub const ASR_REQUESTS_TOTAL: &str = "asr_requests_total";
/// Surface errors total (counter, labels: code).
pub const ASR_ERRORS_TOTAL: &str = "asr_errors_total";
/// Requests refused by the rate limiter (counter, labels: class).
pub const ASR_RATE_LIMITED_TOTAL: &str = "asr_rate_limited_total";
/// Segments transcribed (counter).
pub const ASR_SEGMENTS_TOTAL: &str = "asr_segments_total";
/// Whole-pipeline duration in seconds (histogram).
pub const ASR_PIPELINE_DURATION_SECONDS: &str = "asr_pipeline_duration_seconds";
/// Open WebSocket streams (gauge).
pub const WS_STREAMS_ACTIVE: &str = "ws_streams_active";
