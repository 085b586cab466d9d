//! `/health` and `/version` endpoints.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Sessions currently held by the session manager.
    pub active_sessions: usize,
    /// Jobs currently held by the queue.
    pub jobs: usize,
    /// Whether the recognizer finished initializing.
    pub recognizer_ready: bool,
}

/// Build a health response from live counters.
#[must_use]
pub fn health_check(
    start_time: Instant,
    active_sessions: usize,
    jobs: usize,
    recognizer_ready: bool,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions,
        jobs,
        recognizer_ready,
    }
}

/// Build info for `/version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    /// Service name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Active recognizer backend.
    pub recognizer: String,
    /// Configured enhancer provider.
    pub enhancer: String,
}

/// Build the version response.
#[must_use]
pub fn version_info(recognizer: String, enhancer: String) -> VersionResponse {
    VersionResponse {
        name: "murmur",
        version: env!("CARGO_PKG_VERSION"),
        recognizer,
        enhancer,
    }
}
