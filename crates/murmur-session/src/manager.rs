//! The session store and its operations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use murmur_audio::pcm::{concat_frames, duration_secs, AudioFrame};
use murmur_audio::SAMPLE_RATE;
use murmur_core::{ServiceError, ServiceResult, SessionId};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::state::SessionState;

/// Session manager tuning.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Hard cap on live sessions.
    pub max_sessions: usize,
    /// Idle time before a session expires.
    pub session_ttl: Duration,
    /// Per-session audio cap in seconds; ingest beyond it is refused.
    pub max_session_audio_seconds: u64,
    /// Reaper sweep interval.
    pub reap_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 256,
            session_ttl: Duration::from_secs(600),
            max_session_audio_seconds: 600,
            reap_interval: Duration::from_secs(30),
        }
    }
}

/// Mutable per-session record, always behind the handle's mutex.
struct SessionInner {
    state: SessionState,
    app_hint: Option<String>,
    created_at: DateTime<Utc>,
    last_activity: Instant,
    frames: Vec<AudioFrame>,
    total_samples: usize,
    chunks_received: u64,
    partial_transcript: String,
    final_transcript: Option<String>,
}

struct SessionHandle {
    id: SessionId,
    inner: Mutex<SessionInner>,
    cancel: CancellationToken,
}

/// Acknowledgement for one ingest.
#[derive(Clone, Debug, Serialize)]
pub struct IngestAck {
    /// Best-effort partial transcript; may be stale or empty.
    pub partial_transcript: String,
    /// Chunks accepted so far.
    pub chunks_received: u64,
}

/// Audio and metadata handed to the pipeline when a stop begins.
#[derive(Debug)]
pub struct StopContext {
    /// The accumulated audio, drained from the session.
    pub samples: Vec<i16>,
    /// Chunks the session accepted.
    pub total_chunks: u64,
    /// The client's app hint, for profile selection.
    pub app_hint: Option<String>,
    /// Cancel flag shared with the session; `cancel` fires it.
    pub cancel: CancellationToken,
}

/// Result bookkeeping after a stop completes.
#[derive(Clone, Debug, Serialize)]
pub struct StopSummary {
    /// Chunks the session accepted.
    pub total_chunks: u64,
}

/// Read-only session view.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    /// Session ID.
    pub session_id: String,
    /// Current state.
    pub status: SessionState,
    /// Chunks accepted.
    pub audio_chunks_received: u64,
    /// Buffered audio duration in seconds.
    pub buffered_seconds: f64,
    /// Best-effort partial transcript.
    pub partial_transcript: String,
    /// App hint, when provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_hint: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Owner of all live sessions.
pub struct SessionManager {
    sessions: DashMap<String, Arc<SessionHandle>>,
    config: SessionConfig,
}

impl SessionManager {
    /// Manager with the given tuning.
    #[must_use]
    pub fn new(config: SessionConfig) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            config,
        })
    }

    /// Open a new session.
    #[instrument(skip(self))]
    pub fn open(&self, app_hint: Option<String>) -> ServiceResult<SessionId> {
        if self.sessions.len() >= self.config.max_sessions {
            return Err(ServiceError::ResourceExhausted(format!(
                "session limit of {} reached",
                self.config.max_sessions
            )));
        }
        let id = SessionId::new();
        let handle = Arc::new(SessionHandle {
            id: id.clone(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Started,
                app_hint,
                created_at: Utc::now(),
                last_activity: Instant::now(),
                frames: Vec::new(),
                total_samples: 0,
                chunks_received: 0,
                partial_transcript: String::new(),
                final_transcript: None,
            }),
            cancel: CancellationToken::new(),
        });
        let _ = self.sessions.insert(id.to_string(), handle);
        debug!(session_id = %id, "session opened");
        Ok(id)
    }

    fn handle(&self, id: &str) -> ServiceResult<Arc<SessionHandle>> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::session_not_found(id))
    }

    /// Append PCM bytes to a session.
    ///
    /// Validates the 16-bit framing, enforces the audio cap, and never
    /// blocks on recognition: the returned partial transcript is whatever
    /// hint was last written.
    #[instrument(skip(self, bytes), fields(session_id = id, bytes = bytes.len()))]
    pub async fn ingest(&self, id: &str, bytes: &[u8]) -> ServiceResult<IngestAck> {
        let handle = self.handle(id)?;
        let mut inner = handle.inner.lock().await;

        match inner.state {
            SessionState::Started | SessionState::Receiving => {}
            state => {
                return Err(ServiceError::InvalidState(format!(
                    "cannot ingest audio in state {}",
                    state.as_str()
                )))
            }
        }

        let frame = AudioFrame::from_le_bytes(bytes)
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let cap_samples = self.config.max_session_audio_seconds as usize * SAMPLE_RATE as usize;
        if inner.total_samples + frame.len() > cap_samples {
            // The cap closes the intake: the session moves to Stopping so
            // the client's stop call still gets a transcript.
            inner.state = SessionState::Stopping;
            inner.last_activity = Instant::now();
            warn!(session_id = id, "session audio cap reached, refusing ingest");
            return Err(ServiceError::ResourceExhausted(format!(
                "session audio cap of {}s reached",
                self.config.max_session_audio_seconds
            )));
        }

        if inner.state == SessionState::Started {
            inner.state = SessionState::Receiving;
        }
        inner.total_samples += frame.len();
        inner.frames.push(frame);
        inner.chunks_received += 1;
        inner.last_activity = Instant::now();

        Ok(IngestAck {
            partial_transcript: inner.partial_transcript.clone(),
            chunks_received: inner.chunks_received,
        })
    }

    /// Begin stopping: transition to `Stopping` and drain the audio for the
    /// pipeline. The per-session lock is released before any recognition.
    #[instrument(skip(self), fields(session_id = id))]
    pub async fn begin_stop(&self, id: &str) -> ServiceResult<StopContext> {
        let handle = self.handle(id)?;
        let mut inner = handle.inner.lock().await;

        match inner.state {
            SessionState::Started | SessionState::Receiving => {
                inner.state = SessionState::Stopping;
            }
            // Backpressure already moved it to Stopping; finishing is fine.
            SessionState::Stopping => {}
            state => {
                return Err(ServiceError::InvalidState(format!(
                    "cannot stop session in state {}",
                    state.as_str()
                )))
            }
        }
        inner.last_activity = Instant::now();

        let frames = std::mem::take(&mut inner.frames);
        let samples = concat_frames(&frames);
        info!(
            session_id = id,
            chunks = inner.chunks_received,
            seconds = duration_secs(samples.len()),
            "session stopping"
        );

        Ok(StopContext {
            samples,
            total_chunks: inner.chunks_received,
            app_hint: inner.app_hint.clone(),
            cancel: handle.cancel.clone(),
        })
    }

    /// Record the final transcript and move to `Stopped`.
    pub async fn complete_stop(&self, id: &str, final_transcript: &str) -> ServiceResult<StopSummary> {
        let handle = self.handle(id)?;
        let mut inner = handle.inner.lock().await;

        if !inner.state.can_advance(SessionState::Stopped) {
            return Err(ServiceError::InvalidState(format!(
                "cannot finalize session in state {}",
                inner.state.as_str()
            )));
        }
        inner.state = SessionState::Stopped;
        inner.final_transcript = Some(final_transcript.to_owned());
        inner.partial_transcript = final_transcript.to_owned();
        inner.last_activity = Instant::now();
        Ok(StopSummary {
            total_chunks: inner.chunks_received,
        })
    }

    /// Record a failed stop. The session still terminates (no backward
    /// transitions) but carries no transcript.
    pub async fn fail_stop(&self, id: &str) -> ServiceResult<()> {
        let handle = self.handle(id)?;
        let mut inner = handle.inner.lock().await;
        if inner.state.can_advance(SessionState::Stopped) {
            inner.state = SessionState::Stopped;
            inner.last_activity = Instant::now();
        }
        Ok(())
    }

    /// Cancel a session: discard audio and any in-flight pipeline work.
    ///
    /// Idempotent on an already-cancelled session; other terminal states
    /// refuse.
    #[instrument(skip(self), fields(session_id = id))]
    pub async fn cancel(&self, id: &str) -> ServiceResult<()> {
        let handle = self.handle(id)?;
        let mut inner = handle.inner.lock().await;

        if inner.state == SessionState::Cancelled {
            return Ok(());
        }
        if !inner.state.can_advance(SessionState::Cancelled) {
            return Err(ServiceError::InvalidState(format!(
                "cannot cancel session in state {}",
                inner.state.as_str()
            )));
        }
        inner.state = SessionState::Cancelled;
        inner.frames.clear();
        inner.total_samples = 0;
        inner.partial_transcript.clear();
        inner.last_activity = Instant::now();
        handle.cancel.cancel();
        info!(session_id = id, "session cancelled");
        Ok(())
    }

    /// Read-only snapshot.
    pub async fn status(&self, id: &str) -> ServiceResult<SessionSnapshot> {
        let handle = self.handle(id)?;
        let inner = handle.inner.lock().await;
        Ok(SessionSnapshot {
            session_id: handle.id.to_string(),
            status: inner.state,
            audio_chunks_received: inner.chunks_received,
            buffered_seconds: duration_secs(inner.total_samples),
            partial_transcript: inner.partial_transcript.clone(),
            app_hint: inner.app_hint.clone(),
            created_at: inner.created_at,
        })
    }

    /// Best-effort partial transcript.
    pub async fn preview(&self, id: &str) -> ServiceResult<String> {
        let handle = self.handle(id)?;
        let inner = handle.inner.lock().await;
        Ok(inner.partial_transcript.clone())
    }

    /// Opportunistic partial-transcript update from the pipeline. Ignored
    /// once the session is terminal.
    pub async fn set_partial(&self, id: &str, text: &str) {
        if let Ok(handle) = self.handle(id) {
            let mut inner = handle.inner.lock().await;
            if !inner.state.is_terminal() {
                inner.partial_transcript = text.to_owned();
            }
        }
    }

    /// The stored final transcript, when the session is `Stopped`.
    pub async fn final_transcript(&self, id: &str) -> ServiceResult<Option<String>> {
        let handle = self.handle(id)?;
        let inner = handle.inner.lock().await;
        Ok(inner.final_transcript.clone())
    }

    /// Number of sessions currently held (any state).
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// One reaper sweep: expire idle sessions, drop terminal ones past the
    /// TTL. Returns `(expired, removed)`.
    pub async fn reap_once(&self) -> (usize, usize) {
        let ttl = self.config.session_ttl;
        let handles: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut expired = 0usize;
        let mut to_remove = Vec::new();
        for handle in handles {
            let mut inner = handle.inner.lock().await;
            let idle = inner.last_activity.elapsed();
            if idle < ttl {
                continue;
            }
            if inner.state.is_terminal() {
                to_remove.push(handle.id.to_string());
            } else {
                inner.state = SessionState::Expired;
                inner.frames.clear();
                inner.total_samples = 0;
                handle.cancel.cancel();
                expired += 1;
                debug!(session_id = %handle.id, idle_secs = idle.as_secs(), "session expired");
            }
        }

        let removed = to_remove.len();
        for id in to_remove {
            let _ = self.sessions.remove(&id);
        }
        if expired > 0 || removed > 0 {
            info!(expired, removed, "session reaper sweep");
        }
        (expired, removed)
    }

    /// Run the reaper until shutdown.
    pub fn spawn_reaper(self: &Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(manager.config.reap_interval);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let _ = manager.reap_once().await;
                    }
                    () = shutdown.cancelled() => {
                        debug!("session reaper shutting down");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> Arc<SessionManager> {
        SessionManager::new(SessionConfig::default())
    }

    fn pcm_bytes(samples: usize) -> Vec<u8> {
        vec![0u8; samples * 2]
    }

    // --- open / ingest ---

    #[tokio::test]
    async fn open_then_ingest_transitions_to_receiving() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();

        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Started);

        let ack = mgr.ingest(&id, &pcm_bytes(16_000)).await.unwrap();
        assert_eq!(ack.chunks_received, 1);

        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Receiving);
        assert!((snap.buffered_seconds - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ingest_unknown_session_not_found() {
        let mgr = manager();
        let err = mgr.ingest("missing", &pcm_bytes(10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn odd_byte_count_is_invalid_input_and_leaves_session_unchanged() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(100)).await.unwrap();

        let err = mgr.ingest(&id, &vec![0u8; 1001]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Receiving);
        assert_eq!(snap.audio_chunks_received, 1);
    }

    #[tokio::test]
    async fn audio_is_conserved_across_ingests() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        for n in [160usize, 1600, 4096, 31] {
            let _ = mgr.ingest(&id, &pcm_bytes(n)).await.unwrap();
        }
        let ctx = mgr.begin_stop(&id).await.unwrap();
        assert_eq!(ctx.samples.len(), 160 + 1600 + 4096 + 31);
        assert_eq!(ctx.total_chunks, 4);
    }

    #[tokio::test]
    async fn split_ingest_equals_single_ingest() {
        // The same bytes split at arbitrary even boundaries accumulate to
        // the same audio.
        let payload: Vec<u8> = (0..64_000u32).map(|i| (i % 251) as u8).collect();

        let mgr = manager();
        let whole = mgr.open(None).unwrap();
        let _ = mgr.ingest(&whole, &payload).await.unwrap();
        let whole_ctx = mgr.begin_stop(&whole).await.unwrap();

        let split = mgr.open(None).unwrap();
        for chunk in [&payload[..1000], &payload[1000..30_002], &payload[30_002..]] {
            let _ = mgr.ingest(&split, chunk).await.unwrap();
        }
        let split_ctx = mgr.begin_stop(&split).await.unwrap();

        assert_eq!(whole_ctx.samples, split_ctx.samples);
    }

    // --- stop ---

    #[tokio::test]
    async fn stop_lifecycle_reaches_stopped() {
        let mgr = manager();
        let id = mgr.open(Some("App|com.example.app".into())).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(32_000)).await.unwrap();

        let ctx = mgr.begin_stop(&id).await.unwrap();
        assert_eq!(ctx.app_hint.as_deref(), Some("App|com.example.app"));
        assert_eq!(
            mgr.status(&id).await.unwrap().status,
            SessionState::Stopping
        );

        let summary = mgr.complete_stop(&id, "final text").await.unwrap();
        assert_eq!(summary.total_chunks, 1);
        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Stopped);
        assert_eq!(
            mgr.final_transcript(&id).await.unwrap().as_deref(),
            Some("final text")
        );
    }

    #[tokio::test]
    async fn stop_without_audio_is_allowed() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let ctx = mgr.begin_stop(&id).await.unwrap();
        assert!(ctx.samples.is_empty());
        assert_eq!(ctx.total_chunks, 0);
    }

    #[tokio::test]
    async fn ingest_after_stop_is_invalid_state() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(1000)).await.unwrap();
        let _ = mgr.begin_stop(&id).await.unwrap();
        let _ = mgr.complete_stop(&id, "done").await.unwrap();

        let err = mgr.ingest(&id, &pcm_bytes(500)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert_eq!(mgr.status(&id).await.unwrap().status, SessionState::Stopped);
    }

    #[tokio::test]
    async fn double_stop_is_invalid_state() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.begin_stop(&id).await.unwrap();
        let _ = mgr.complete_stop(&id, "x").await.unwrap();

        let err = mgr.begin_stop(&id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn failed_stop_still_terminates() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.begin_stop(&id).await.unwrap();
        mgr.fail_stop(&id).await.unwrap();
        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Stopped);
        assert!(mgr.final_transcript(&id).await.unwrap().is_none());
    }

    // --- cancel ---

    #[tokio::test]
    async fn cancel_discards_audio_and_fires_token() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(16_000)).await.unwrap();

        let ctx_token = {
            // Grab the shared token before cancelling.
            let ctx = mgr.begin_stop(&id).await.unwrap();
            ctx.cancel
        };
        mgr.cancel(&id).await.unwrap();
        assert!(ctx_token.is_cancelled());

        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Cancelled);
        assert_eq!(snap.buffered_seconds, 0.0);
        assert!(snap.partial_transcript.is_empty());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        mgr.cancel(&id).await.unwrap();
        mgr.cancel(&id).await.unwrap();
        assert_eq!(
            mgr.status(&id).await.unwrap().status,
            SessionState::Cancelled
        );
    }

    #[tokio::test]
    async fn cancel_after_stopped_is_invalid() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.begin_stop(&id).await.unwrap();
        let _ = mgr.complete_stop(&id, "x").await.unwrap();
        let err = mgr.cancel(&id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn no_mutation_after_cancel() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        mgr.cancel(&id).await.unwrap();

        assert!(mgr.ingest(&id, &pcm_bytes(100)).await.is_err());
        assert!(mgr.begin_stop(&id).await.is_err());
        mgr.set_partial(&id, "should not stick").await;
        assert_eq!(mgr.preview(&id).await.unwrap(), "");
    }

    // --- backpressure ---

    #[tokio::test]
    async fn audio_cap_exhausts_and_closes_intake() {
        let mgr = SessionManager::new(SessionConfig {
            max_session_audio_seconds: 1,
            ..SessionConfig::default()
        });
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(12_000)).await.unwrap();

        let err = mgr.ingest(&id, &pcm_bytes(12_000)).await.unwrap_err();
        assert!(matches!(err, ServiceError::ResourceExhausted(_)));
        assert_eq!(
            mgr.status(&id).await.unwrap().status,
            SessionState::Stopping
        );

        // The stop path still works from here.
        let ctx = mgr.begin_stop(&id).await.unwrap();
        assert_eq!(ctx.samples.len(), 12_000);
    }

    #[tokio::test]
    async fn session_limit_is_resource_exhausted() {
        let mgr = SessionManager::new(SessionConfig {
            max_sessions: 2,
            ..SessionConfig::default()
        });
        let _a = mgr.open(None).unwrap();
        let _b = mgr.open(None).unwrap();
        let err = mgr.open(None).unwrap_err();
        assert!(matches!(err, ServiceError::ResourceExhausted(_)));
    }

    // --- partials ---

    #[tokio::test]
    async fn partial_updates_flow_to_preview_and_ingest() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(100)).await.unwrap();

        mgr.set_partial(&id, "so far so good").await;
        assert_eq!(mgr.preview(&id).await.unwrap(), "so far so good");

        let ack = mgr.ingest(&id, &pcm_bytes(100)).await.unwrap();
        assert_eq!(ack.partial_transcript, "so far so good");
    }

    // --- reaper ---

    #[tokio::test]
    async fn reaper_expires_idle_sessions() {
        let mgr = SessionManager::new(SessionConfig {
            session_ttl: Duration::from_millis(20),
            ..SessionConfig::default()
        });
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(16_000)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        let (expired, removed) = mgr.reap_once().await;
        assert_eq!(expired, 1);
        assert_eq!(removed, 0);

        let snap = mgr.status(&id).await.unwrap();
        assert_eq!(snap.status, SessionState::Expired);
        assert_eq!(snap.buffered_seconds, 0.0);
    }

    #[tokio::test]
    async fn reaper_removes_terminal_sessions_after_ttl() {
        let mgr = SessionManager::new(SessionConfig {
            session_ttl: Duration::from_millis(20),
            ..SessionConfig::default()
        });
        let id = mgr.open(None).unwrap();
        let _ = mgr.begin_stop(&id).await.unwrap();
        let _ = mgr.complete_stop(&id, "x").await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        let (expired, removed) = mgr.reap_once().await;
        assert_eq!(expired, 0);
        assert_eq!(removed, 1);
        assert!(mgr.status(&id).await.is_err());
        assert_eq!(mgr.session_count(), 0);
    }

    #[tokio::test]
    async fn reaper_leaves_active_sessions_alone() {
        let mgr = manager();
        let id = mgr.open(None).unwrap();
        let _ = mgr.ingest(&id, &pcm_bytes(100)).await.unwrap();
        let (expired, removed) = mgr.reap_once().await;
        assert_eq!((expired, removed), (0, 0));
        assert_eq!(
            mgr.status(&id).await.unwrap().status,
            SessionState::Receiving
        );
    }

    #[tokio::test]
    async fn reaper_task_respects_shutdown() {
        let mgr = SessionManager::new(SessionConfig {
            reap_interval: Duration::from_millis(5),
            ..SessionConfig::default()
        });
        let shutdown = CancellationToken::new();
        let handle = mgr.spawn_reaper(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(15)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper should exit on shutdown")
            .unwrap();
    }
}
