//! Session endpoints and one-shot transcription.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use murmur_audio::decode::{decode_container, is_riff};
use murmur_audio::pcm::{duration_secs, AudioFrame, SAMPLE_RATE};
use murmur_core::ServiceError;
use murmur_pipeline::{NullSink, PipelineError};
use murmur_session::{SessionSnapshot, SessionState};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{service_error_from_pipeline, ApiError};
use crate::service::TranscribeOptions;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// `"AppName|bundle.id"` used for post-process profile selection.
    pub app_hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub status: &'static str,
}

/// POST `/api/asr/start`. The body is an optional JSON `{app_hint}`.
pub async fn start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartResponse>, ApiError> {
    let app_hint = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<StartRequest>(&body)
            .map_err(|e| ApiError(ServiceError::InvalidInput(format!("bad start body: {e}"))))?
            .app_hint
    };
    let session_id = state.sessions.open(app_hint)?;
    Ok(Json(StartResponse {
        session_id: session_id.into_inner(),
        status: "started",
    }))
}

#[derive(Debug, Serialize)]
pub struct AudioResponse {
    pub partial_transcript: String,
    pub is_final: bool,
}

/// POST `/api/asr/audio/{session_id}`, raw PCM chunk.
pub async fn audio(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<Json<AudioResponse>, ApiError> {
    let ack = state.sessions.ingest(&session_id, &body).await?;
    Ok(Json(AudioResponse {
        partial_transcript: ack.partial_transcript,
        is_final: false,
    }))
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub session_id: String,
    pub status: &'static str,
    pub final_transcript: String,
    pub total_chunks: u64,
}

/// POST `/api/asr/stop/{session_id}`: finalize and transcribe.
#[instrument(skip(state), fields(session_id))]
pub async fn stop(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StopResponse>, ApiError> {
    let ctx = state.sessions.begin_stop(&session_id).await?;

    let final_transcript = if ctx.samples.is_empty() {
        String::new()
    } else {
        let opts = TranscribeOptions::default();
        match state
            .svc
            .transcribe(ctx.samples, &opts, Arc::new(NullSink), ctx.cancel.clone())
            .await
        {
            Ok(output) => {
                let processed = state
                    .svc
                    .postprocess(
                        &output.final_transcript,
                        state.svc.default_mode(),
                        ctx.app_hint.as_deref(),
                        &output.paragraph_hints,
                    )
                    .await;
                processed.text
            }
            Err(PipelineError::Cancelled) => {
                // The session was cancelled mid-stop; it already discarded
                // its audio and owes no transcript.
                return Err(ApiError(ServiceError::InvalidState(
                    "session cancelled during stop".into(),
                )));
            }
            Err(e) => {
                state.sessions.fail_stop(&session_id).await?;
                return Err(ApiError(service_error_from_pipeline(e)));
            }
        }
    };

    let summary = state
        .sessions
        .complete_stop(&session_id, &final_transcript)
        .await?;
    info!(session_id, chunks = summary.total_chunks, "session stopped");

    Ok(Json(StopResponse {
        session_id,
        status: "stopped",
        final_transcript,
        total_chunks: summary.total_chunks,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
}

/// POST `/api/asr/cancel/{session_id}`
pub async fn cancel(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    state.sessions.cancel(&session_id).await?;
    Ok(Json(CancelResponse {
        status: "cancelled",
    }))
}

/// GET `/api/asr/status/{session_id}`
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.status(&session_id).await?))
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub session_id: String,
    pub partial_transcript: String,
    pub is_final: bool,
}

/// GET `/api/asr/preview/{session_id}`
pub async fn preview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let snapshot = state.sessions.status(&session_id).await?;
    Ok(Json(PreviewResponse {
        session_id,
        partial_transcript: snapshot.partial_transcript,
        is_final: snapshot.status == SessionState::Stopped,
    }))
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub duration: f64,
    pub sample_rate: u32,
}

/// POST `/api/asr/transcribe`: one-shot, raw PCM or a WAV container
/// (sniffed by the RIFF magic).
#[instrument(skip_all, fields(bytes = body.len()))]
pub async fn transcribe(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError(ServiceError::InvalidInput(
            "empty audio body".into(),
        )));
    }

    let samples = if is_riff(&body) {
        let bytes = body.to_vec();
        tokio::task::spawn_blocking(move || decode_container(&bytes, Some("wav")))
            .await
            .map_err(|e| ApiError(ServiceError::Internal(format!("decode task: {e}"))))??
            .samples
    } else {
        AudioFrame::from_le_bytes(&body)?.samples().to_vec()
    };

    let duration = duration_secs(samples.len());
    let output = state
        .svc
        .transcribe(
            samples,
            &TranscribeOptions::default(),
            Arc::new(NullSink),
            tokio_util::sync::CancellationToken::new(),
        )
        .await?;

    Ok(Json(TranscribeResponse {
        transcript: output.final_transcript,
        duration,
        sample_rate: SAMPLE_RATE,
    }))
}
