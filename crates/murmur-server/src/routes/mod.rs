//! REST handlers, grouped by surface.

pub mod asr;
pub mod dictionary;
pub mod jobs;
pub mod postprocess;

use axum::extract::Multipart;
use murmur_audio::decode::{decode_container, extension_accepted};
use murmur_core::ServiceError;

use crate::error::ApiError;

/// One uploaded file.
pub(crate) struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Read every file field out of a multipart body.
pub(crate) async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(ServiceError::InvalidInput(format!("multipart: {e}"))))?
    {
        let Some(filename) = field.file_name().map(ToOwned::to_owned) else {
            continue; // non-file fields carry parameters we read from the query
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError(ServiceError::InvalidInput(format!("multipart read: {e}"))))?;
        uploads.push(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    if uploads.is_empty() {
        return Err(ApiError(ServiceError::InvalidInput(
            "no file field in multipart body".into(),
        )));
    }
    Ok(uploads)
}

/// Read exactly one uploaded file.
pub(crate) async fn read_upload(multipart: Multipart) -> Result<Upload, ApiError> {
    let mut uploads = read_uploads(multipart).await?;
    Ok(uploads.remove(0))
}

/// Decode an uploaded container to canonical PCM on the blocking pool.
pub(crate) async fn decode_upload(upload: &Upload) -> Result<Vec<i16>, ServiceError> {
    if !extension_accepted(&upload.filename) {
        return Err(ServiceError::InvalidInput(format!(
            "unsupported file extension: {:?}",
            upload.filename
        )));
    }
    let bytes = upload.bytes.clone();
    let ext = upload
        .filename
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase);
    let decoded = tokio::task::spawn_blocking(move || decode_container(&bytes, ext.as_deref()))
        .await
        .map_err(|e| ServiceError::Internal(format!("decode task: {e}")))?
        .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
    Ok(decoded.samples)
}
