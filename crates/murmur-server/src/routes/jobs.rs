//! Job queue endpoints for long uploads.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use murmur_jobs::{JobInfo, JobInput, JobState, JobStats};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::routes::postprocess::UploadParams;
use crate::routes::{decode_upload, read_upload};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: &'static str,
}

/// POST `/api/jobs/submit`: queue a long upload.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let file = read_upload(multipart).await?;
    let samples = decode_upload(&file).await?;

    let input = JobInput {
        samples,
        filename: Some(file.filename),
        language: params.language()?,
        strategy: params.strategy()?,
        merge_strategy: params.merge()?,
        postprocess_mode: params.mode(state.svc.default_mode())?,
    };
    let job_id = state.jobs.submit(input)?;

    Ok(Json(SubmitResponse {
        job_id: job_id.into_inner(),
        status: "submitted",
    }))
}

/// GET `/api/jobs/{job_id}`
pub async fn get(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobInfo>, ApiError> {
    Ok(Json(state.jobs.status(&job_id)?))
}

/// POST `/api/jobs/{job_id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobInfo>, ApiError> {
    Ok(Json(state.jobs.cancel(&job_id)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub jobs: Vec<JobInfo>,
    pub total: usize,
}

/// GET `/api/jobs/`
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let filter: Option<JobState> = match params.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse()?),
    };
    let jobs = state.jobs.list(filter, params.limit.unwrap_or(100));
    let total = jobs.len();
    Ok(Json(ListResponse { jobs, total }))
}

/// GET `/api/jobs/stats`
pub async fn stats(State(state): State<AppState>) -> Json<JobStats> {
    Json(state.jobs.stats())
}
