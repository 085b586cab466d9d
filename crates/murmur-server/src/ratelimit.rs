//! Fixed-window rate limiting per endpoint class and client address.
//!
//! Each class carries its own quota per one-minute window. The Nth request
//! in a window succeeds iff `N <= quota`; the first refusal reports the
//! seconds until the window resets. Health, version, metrics, and
//! WebSocket upgrades are exempt.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use metrics::counter;
use murmur_core::ServiceError;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The fixed window length.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Endpoint classes with distinct quotas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Session open/stop/cancel.
    SessionControl,
    /// Audio chunk ingestion.
    SessionAudio,
    /// Session status and preview.
    SessionRead,
    /// One-shot transcription.
    Transcribe,
    /// Short upload.
    Upload,
    /// Segmented long upload.
    UploadLong,
    /// Multi-file batch.
    Batch,
    /// Text post-processing.
    TextProcess,
    /// Post-process config reads/writes.
    PostProcessConfig,
    /// Dictionary admin.
    Dictionary,
    /// Job submission.
    JobSubmit,
    /// Job polling (status, stats).
    JobPoll,
    /// Job cancel and listing.
    JobControl,
}

impl EndpointClass {
    /// Requests allowed per window.
    #[must_use]
    pub fn quota(self) -> u32 {
        match self {
            Self::SessionControl => 20,
            Self::SessionAudio => 300,
            Self::SessionRead => 60,
            Self::Transcribe => 10,
            Self::Upload => 10,
            Self::UploadLong => 5,
            Self::Batch => 3,
            Self::TextProcess => 30,
            Self::PostProcessConfig => 60,
            Self::Dictionary => 60,
            Self::JobSubmit => 10,
            Self::JobPoll => 300,
            Self::JobControl => 60,
        }
    }

    /// Label for metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionControl => "session_control",
            Self::SessionAudio => "session_audio",
            Self::SessionRead => "session_read",
            Self::Transcribe => "transcribe",
            Self::Upload => "upload",
            Self::UploadLong => "upload_long",
            Self::Batch => "batch",
            Self::TextProcess => "text",
            Self::PostProcessConfig => "postprocess_config",
            Self::Dictionary => "dictionary",
            Self::JobSubmit => "job_submit",
            Self::JobPoll => "job_poll",
            Self::JobControl => "job_control",
        }
    }
}

/// Map a request path to its class. `None` means exempt.
#[must_use]
pub fn classify(path: &str) -> Option<EndpointClass> {
    // Exempt: health, version, metrics, and the WebSocket upgrade.
    match path {
        "/health" | "/version" | "/metrics" | "/api/asr/stream-progress" => return None,
        _ => {}
    }

    if let Some(rest) = path.strip_prefix("/api/asr/") {
        let head = rest.split('/').next().unwrap_or("");
        return match head {
            "start" | "stop" | "cancel" => Some(EndpointClass::SessionControl),
            "audio" => Some(EndpointClass::SessionAudio),
            "status" | "preview" => Some(EndpointClass::SessionRead),
            "transcribe" => Some(EndpointClass::Transcribe),
            "dictionary" => Some(EndpointClass::Dictionary),
            _ => None,
        };
    }
    if let Some(rest) = path.strip_prefix("/api/postprocess/") {
        return match rest {
            "upload" => Some(EndpointClass::Upload),
            "upload-long" => Some(EndpointClass::UploadLong),
            "batch-transcribe" => Some(EndpointClass::Batch),
            "text" => Some(EndpointClass::TextProcess),
            "config" => Some(EndpointClass::PostProcessConfig),
            _ => None,
        };
    }
    if let Some(rest) = path.strip_prefix("/api/jobs") {
        let rest = rest.trim_start_matches('/');
        return match rest {
            "submit" => Some(EndpointClass::JobSubmit),
            "stats" => Some(EndpointClass::JobPoll),
            "" => Some(EndpointClass::JobControl), // listing
            _ if rest.ends_with("/cancel") => Some(EndpointClass::JobControl),
            _ => Some(EndpointClass::JobPoll), // GET /api/jobs/{id}
        };
    }
    None
}

struct WindowState {
    started: Instant,
    count: u32,
}

/// Fixed-window counters keyed by `(class, client)`.
pub struct FixedWindowLimiter {
    windows: DashMap<(EndpointClass, String), WindowState>,
}

impl FixedWindowLimiter {
    /// Empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Check and count one request. Returns `RateLimited` with a
    /// `retry_after` hint when the quota is exhausted.
    pub fn check(&self, class: EndpointClass, client: &str) -> Result<(), ServiceError> {
        let quota = class.quota();
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry((class, client.to_owned()))
            .or_insert_with(|| WindowState {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= WINDOW {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= quota {
            let elapsed = now.duration_since(entry.started);
            let retry_after = WINDOW.saturating_sub(elapsed).as_secs().clamp(1, 60);
            return Err(ServiceError::RateLimited { retry_after });
        }
        entry.count += 1;
        Ok(())
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Axum middleware enforcing the per-class quotas.
pub async fn rate_limit_mw(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(class) = classify(req.uri().path()) else {
        return next.run(req).await;
    };
    counter!("asr_requests_total", "class" => class.as_str()).increment(1);

    if !state.config.rate_limit_enabled {
        return next.run(req).await;
    }

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "local".to_owned(), |info| info.0.ip().to_string());

    if let Err(e) = state.limiter.check(class, &client) {
        counter!("asr_rate_limited_total", "class" => class.as_str()).increment(1);
        debug!(class = class.as_str(), client, "request rate limited");
        return ApiError(e).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_asr_paths() {
        assert_eq!(classify("/api/asr/start"), Some(EndpointClass::SessionControl));
        assert_eq!(classify("/api/asr/stop/abc"), Some(EndpointClass::SessionControl));
        assert_eq!(classify("/api/asr/cancel/abc"), Some(EndpointClass::SessionControl));
        assert_eq!(classify("/api/asr/audio/abc"), Some(EndpointClass::SessionAudio));
        assert_eq!(classify("/api/asr/status/abc"), Some(EndpointClass::SessionRead));
        assert_eq!(classify("/api/asr/preview/abc"), Some(EndpointClass::SessionRead));
        assert_eq!(classify("/api/asr/transcribe"), Some(EndpointClass::Transcribe));
        assert_eq!(classify("/api/asr/dictionary"), Some(EndpointClass::Dictionary));
        assert_eq!(classify("/api/asr/dictionary/api"), Some(EndpointClass::Dictionary));
    }

    #[test]
    fn classify_postprocess_paths() {
        assert_eq!(classify("/api/postprocess/upload"), Some(EndpointClass::Upload));
        assert_eq!(classify("/api/postprocess/upload-long"), Some(EndpointClass::UploadLong));
        assert_eq!(classify("/api/postprocess/batch-transcribe"), Some(EndpointClass::Batch));
        assert_eq!(classify("/api/postprocess/text"), Some(EndpointClass::TextProcess));
        assert_eq!(classify("/api/postprocess/config"), Some(EndpointClass::PostProcessConfig));
    }

    #[test]
    fn classify_job_paths() {
        assert_eq!(classify("/api/jobs/submit"), Some(EndpointClass::JobSubmit));
        assert_eq!(classify("/api/jobs/abc123"), Some(EndpointClass::JobPoll));
        assert_eq!(classify("/api/jobs/abc123/cancel"), Some(EndpointClass::JobControl));
        assert_eq!(classify("/api/jobs/"), Some(EndpointClass::JobControl));
        assert_eq!(classify("/api/jobs/stats"), Some(EndpointClass::JobPoll));
    }

    #[test]
    fn exempt_paths() {
        assert_eq!(classify("/health"), None);
        assert_eq!(classify("/version"), None);
        assert_eq!(classify("/metrics"), None);
        assert_eq!(classify("/api/asr/stream-progress"), None);
        assert_eq!(classify("/does/not/exist"), None);
    }

    #[test]
    fn quota_matches_contract() {
        assert_eq!(EndpointClass::SessionControl.quota(), 20);
        assert_eq!(EndpointClass::SessionAudio.quota(), 300);
        assert_eq!(EndpointClass::Transcribe.quota(), 10);
        assert_eq!(EndpointClass::UploadLong.quota(), 5);
        assert_eq!(EndpointClass::Batch.quota(), 3);
        assert_eq!(EndpointClass::TextProcess.quota(), 30);
        assert_eq!(EndpointClass::JobSubmit.quota(), 10);
        assert_eq!(EndpointClass::JobPoll.quota(), 300);
    }

    #[test]
    fn nth_request_succeeds_iff_within_quota() {
        let limiter = FixedWindowLimiter::new();
        for _ in 0..10 {
            limiter
                .check(EndpointClass::Transcribe, "10.0.0.1")
                .unwrap();
        }
        let err = limiter
            .check(EndpointClass::Transcribe, "10.0.0.1")
            .unwrap_err();
        match err {
            ServiceError::RateLimited { retry_after } => {
                assert!((1..=60).contains(&retry_after));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = FixedWindowLimiter::new();
        for _ in 0..3 {
            limiter.check(EndpointClass::Batch, "10.0.0.1").unwrap();
        }
        assert!(limiter.check(EndpointClass::Batch, "10.0.0.1").is_err());
        assert!(limiter.check(EndpointClass::Batch, "10.0.0.2").is_ok());
    }

    #[test]
    fn classes_are_counted_separately() {
        let limiter = FixedWindowLimiter::new();
        for _ in 0..3 {
            limiter.check(EndpointClass::Batch, "c").unwrap();
        }
        assert!(limiter.check(EndpointClass::Batch, "c").is_err());
        assert!(limiter.check(EndpointClass::Transcribe, "c").is_ok());
    }
}
