//! Shared state accessible from every handler.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use murmur_jobs::JobQueue;
use murmur_session::SessionManager;

use crate::config::ServerConfig;
use crate::ratelimit::FixedWindowLimiter;
use crate::service::TranscriptionService;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager.
    pub sessions: Arc<SessionManager>,
    /// Job queue.
    pub jobs: Arc<JobQueue>,
    /// Segment → recognize → merge → post-process service.
    pub svc: TranscriptionService,
    /// Fixed-window rate limiter.
    pub limiter: Arc<FixedWindowLimiter>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Server configuration.
    pub config: ServerConfig,
    /// Prometheus metrics handle for rendering.
    pub metrics_handle: Arc<PrometheusHandle>,
}
