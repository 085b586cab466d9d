//! Personal dictionary admin endpoints.

use axum::extract::{Path, State};
use axum::Json;
use murmur_core::ServiceError;
use murmur_text::DictionaryEntry;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DictionaryListResponse {
    pub entries: Vec<DictionaryEntry>,
    pub total: usize,
}

/// GET `/api/asr/dictionary`
pub async fn list(State(state): State<AppState>) -> Json<DictionaryListResponse> {
    let entries = state.svc.dictionary.entries();
    let total = entries.len();
    Json(DictionaryListResponse { entries, total })
}

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub spoken: String,
    pub written: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_whole_word")]
    pub whole_word: bool,
}

fn default_whole_word() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub status: &'static str,
    pub entry: DictionaryEntry,
}

/// POST `/api/asr/dictionary`
pub async fn upsert(
    State(state): State<AppState>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    if req.spoken.trim().is_empty() || req.written.is_empty() {
        return Err(ApiError(ServiceError::InvalidInput(
            "dictionary entries need a spoken and a written form".into(),
        )));
    }
    let entry = DictionaryEntry {
        spoken: req.spoken.trim().to_owned(),
        written: req.written,
        category: req.category.unwrap_or_else(|| "custom".to_owned()),
        case_sensitive: req.case_sensitive,
        whole_word: req.whole_word,
    };
    state.svc.dictionary.upsert(entry.clone());
    info!(spoken = %entry.spoken, written = %entry.written, "dictionary entry upserted");
    Ok(Json(UpsertResponse {
        status: "ok",
        entry,
    }))
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub status: &'static str,
    pub spoken: String,
}

/// DELETE `/api/asr/dictionary/{spoken}`
pub async fn remove(
    State(state): State<AppState>,
    Path(spoken): Path<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    if !state.svc.dictionary.remove(&spoken) {
        return Err(ApiError(ServiceError::NotFound(format!(
            "no dictionary entry for {spoken:?}"
        ))));
    }
    info!(spoken = %spoken, "dictionary entry removed");
    Ok(Json(RemoveResponse {
        status: "deleted",
        spoken,
    }))
}
