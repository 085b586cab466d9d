//! Upload transcription and text post-processing endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use murmur_audio::pcm::duration_secs;
use murmur_core::{Language, ServiceError};
use murmur_pipeline::{MergeStats, MergeStrategy, NullSink};
use murmur_segment::SegmentStrategy;
use murmur_text::{PostProcessMode, PostProcessStats};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::routes::{decode_upload, read_upload, read_uploads};
use crate::service::TranscribeOptions;
use crate::state::AppState;

/// Query parameters shared by the upload endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub language: Option<String>,
    pub postprocess_mode: Option<String>,
    pub strategy: Option<String>,
    pub merge_strategy: Option<String>,
}

impl UploadParams {
    pub(crate) fn language(&self) -> Result<Language, ServiceError> {
        self.language.as_deref().unwrap_or("auto").parse()
    }

    pub(crate) fn mode(&self, default: PostProcessMode) -> Result<PostProcessMode, ServiceError> {
        match self.postprocess_mode.as_deref() {
            None => Ok(default),
            Some(raw) => raw.parse(),
        }
    }

    pub(crate) fn strategy(&self) -> Result<SegmentStrategy, ServiceError> {
        self.strategy.as_deref().unwrap_or("hybrid").parse()
    }

    pub(crate) fn merge(&self) -> Result<MergeStrategy, ServiceError> {
        self.merge_strategy.as_deref().unwrap_or("simple").parse()
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub transcript: String,
    pub processed_transcript: String,
    pub stats: PostProcessStats,
    pub duration: f64,
}

/// POST `/api/postprocess/upload`: one short file.
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let file = read_upload(multipart).await?;
    let samples = decode_upload(&file).await?;
    let duration = duration_secs(samples.len());

    let opts = TranscribeOptions {
        language: params.language()?,
        ..TranscribeOptions::default()
    };
    let mode = params.mode(state.svc.default_mode())?;

    let output = state
        .svc
        .transcribe(samples, &opts, Arc::new(NullSink), CancellationToken::new())
        .await?;
    let processed = state
        .svc
        .postprocess(&output.final_transcript, mode, None, &output.paragraph_hints)
        .await;

    Ok(Json(UploadResponse {
        filename: file.filename,
        transcript: output.final_transcript,
        processed_transcript: processed.text,
        stats: processed.stats,
        duration,
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadLongResponse {
    pub filename: String,
    pub final_transcript: String,
    pub processed_transcript: String,
    pub num_segments: usize,
    pub merge_stats: MergeStats,
    pub postprocess_stats: PostProcessStats,
    pub duration: f64,
    pub strategy: &'static str,
    pub merge_strategy: &'static str,
}

/// POST `/api/postprocess/upload-long`: segmented long file.
#[instrument(skip_all)]
pub async fn upload_long(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Multipart,
) -> Result<Json<UploadLongResponse>, ApiError> {
    let file = read_upload(multipart).await?;
    let samples = decode_upload(&file).await?;
    let duration = duration_secs(samples.len());

    let opts = TranscribeOptions {
        strategy: params.strategy()?,
        merge_strategy: params.merge()?,
        language: params.language()?,
    };
    let mode = params.mode(state.svc.default_mode())?;

    let output = state
        .svc
        .transcribe(samples, &opts, Arc::new(NullSink), CancellationToken::new())
        .await?;
    let processed = state
        .svc
        .postprocess(&output.final_transcript, mode, None, &output.paragraph_hints)
        .await;

    Ok(Json(UploadLongResponse {
        filename: file.filename,
        final_transcript: output.final_transcript,
        processed_transcript: processed.text,
        num_segments: output.per_segment.len(),
        merge_stats: output.merge_stats,
        postprocess_stats: processed.stats,
        duration,
        strategy: opts.strategy.as_str(),
        merge_strategy: opts.merge_strategy.as_str(),
    }))
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<Value>,
    pub total: usize,
    pub succeeded: usize,
}

/// POST `/api/postprocess/batch-transcribe`: several files, per-file
/// error isolation.
#[instrument(skip_all)]
pub async fn batch_transcribe(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    let files = read_uploads(multipart).await?;
    let opts = TranscribeOptions {
        strategy: params.strategy()?,
        merge_strategy: params.merge()?,
        language: params.language()?,
    };
    let mode = params.mode(state.svc.default_mode())?;

    let mut results = Vec::with_capacity(files.len());
    let mut succeeded = 0usize;
    for file in &files {
        let item = transcribe_one(&state, file, &opts, mode).await;
        match item {
            Ok(value) => {
                succeeded += 1;
                results.push(value);
            }
            Err(e) => {
                warn!(filename = %file.filename, error = %e, "batch item failed");
                results.push(json!({
                    "filename": file.filename,
                    "error": e.to_string(),
                }));
            }
        }
    }

    let total = results.len();
    Ok(Json(BatchResponse {
        results,
        total,
        succeeded,
    }))
}

async fn transcribe_one(
    state: &AppState,
    file: &crate::routes::Upload,
    opts: &TranscribeOptions,
    mode: PostProcessMode,
) -> Result<Value, ServiceError> {
    let samples = decode_upload(file).await?;
    let duration = duration_secs(samples.len());
    let output = state
        .svc
        .transcribe(samples, opts, Arc::new(NullSink), CancellationToken::new())
        .await
        .map_err(crate::error::service_error_from_pipeline)?;
    let processed = state
        .svc
        .postprocess(&output.final_transcript, mode, None, &output.paragraph_hints)
        .await;
    Ok(json!({
        "filename": file.filename,
        "transcript": output.final_transcript,
        "processed_transcript": processed.text,
        "duration": duration,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub use_llm: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub original: String,
    pub processed: String,
    pub stats: PostProcessStats,
}

/// POST `/api/postprocess/text`
pub async fn text(
    State(state): State<AppState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<TextResponse>, ApiError> {
    let mut mode = match req.mode.as_deref() {
        None => state.svc.default_mode(),
        Some(raw) => raw.parse()?,
    };
    // `use_llm` upgrades to the enhancer path without changing the rules.
    if req.use_llm == Some(true) {
        mode = PostProcessMode::Advanced;
    }

    let outcome = state.svc.postprocess(&req.text, mode, None, &[]).await;
    Ok(Json(TextResponse {
        original: req.text,
        processed: outcome.text,
        stats: outcome.stats,
    }))
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub default_mode: &'static str,
    pub fillers: Vec<String>,
    pub correction_cues: Vec<String>,
    pub enhancer_provider: String,
    pub dictionary_entries: usize,
}

fn current_config(state: &AppState) -> ConfigResponse {
    let processor = state.svc.processor();
    ConfigResponse {
        default_mode: state.svc.default_mode().as_str(),
        fillers: processor.fillers().to_vec(),
        correction_cues: processor.correction_cues().to_vec(),
        enhancer_provider: state
            .svc
            .enhancer
            .as_ref()
            .map_or_else(|| "none".to_owned(), |e| e.provider().to_owned()),
        dictionary_entries: state.svc.dictionary.len(),
    }
}

/// GET `/api/postprocess/config`
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(current_config(&state))
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub default_mode: Option<String>,
    #[serde(default)]
    pub fillers: Option<Vec<String>>,
    #[serde(default)]
    pub correction_cues: Option<Vec<String>>,
}

/// POST `/api/postprocess/config`
pub async fn set_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<ConfigResponse>, ApiError> {
    if let Some(raw) = update.default_mode.as_deref() {
        state.svc.set_default_mode(raw.parse()?);
    }
    if update.fillers.is_some() || update.correction_cues.is_some() {
        state.svc.set_rules(update.fillers, update.correction_cues);
    }
    Ok(Json(current_config(&state)))
}
