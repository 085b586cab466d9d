//! `ServiceError` → HTTP response mapping.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics::counter;
use murmur_audio::pcm::AudioError;
use murmur_core::ServiceError;
use murmur_pipeline::PipelineError;
use murmur_recognize::RecognizerError;

/// Wrapper giving `ServiceError` an HTTP rendering.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::RecognizerFailed(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.0.to_body();
        counter!("asr_errors_total", "code" => body.error.clone()).increment(1);

        let mut response = (status, Json(body)).into_response();
        if let ServiceError::RateLimited { retry_after } = self.0 {
            if let Ok(value) = header::HeaderValue::from_str(&retry_after.to_string()) {
                let _ = response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<AudioError> for ApiError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::OddByteCount(_) | AudioError::Decode(_) => {
                Self(ServiceError::InvalidInput(e.to_string()))
            }
            other => Self(ServiceError::Internal(other.to_string())),
        }
    }
}

impl From<RecognizerError> for ApiError {
    fn from(e: RecognizerError) -> Self {
        Self(service_error_from_recognizer(e))
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(service_error_from_pipeline(e))
    }
}

/// Map a recognizer failure onto the surface taxonomy.
pub fn service_error_from_recognizer(e: RecognizerError) -> ServiceError {
    match e {
        RecognizerError::UnsupportedLanguage(lang) => {
            ServiceError::InvalidInput(format!("unsupported language: {lang}"))
        }
        other => ServiceError::RecognizerFailed(other.to_string()),
    }
}

/// Map a pipeline failure onto the surface taxonomy.
pub fn service_error_from_pipeline(e: PipelineError) -> ServiceError {
    match e {
        PipelineError::Cancelled => ServiceError::InvalidState("transcription cancelled".into()),
        PipelineError::RecognizerFailed(msg) => ServiceError::RecognizerFailed(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ServiceError::InvalidInput("x".into()), 400),
            (ServiceError::NotFound("x".into()), 404),
            (ServiceError::InvalidState("x".into()), 409),
            (ServiceError::Unauthenticated, 401),
            (ServiceError::Forbidden, 403),
            (ServiceError::RateLimited { retry_after: 3 }, 429),
            (ServiceError::ResourceExhausted("x".into()), 503),
            (ServiceError::RecognizerFailed("x".into()), 502),
            (ServiceError::Internal("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError(err).status().as_u16(), code);
        }
    }

    #[test]
    fn rate_limited_carries_retry_after_header() {
        let resp = ApiError(ServiceError::RateLimited { retry_after: 17 }).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get(header::RETRY_AFTER).unwrap(),
            &header::HeaderValue::from_static("17")
        );
    }

    #[test]
    fn audio_errors_map_to_invalid_input() {
        let api: ApiError = AudioError::OddByteCount(1001).into();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        let api: ApiError = AudioError::Decode("corrupt".into()).into();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn recognizer_errors_map_to_bad_gateway() {
        let api: ApiError = RecognizerError::InitFailed("no model".into()).into();
        assert_eq!(api.status(), StatusCode::BAD_GATEWAY);
        let api: ApiError = RecognizerError::UnsupportedLanguage("xx".into()).into();
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    }
}
