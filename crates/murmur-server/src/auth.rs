//! Optional API-key admission control.
//!
//! When the server carries an API key, every request outside the health
//! surface must present it in `X-API-Key`. A missing key is 401; a wrong
//! one is 403.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use murmur_core::ServiceError;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths reachable without a key.
fn exempt(path: &str) -> bool {
    matches!(path, "/health" | "/version" | "/metrics")
}

/// Axum middleware enforcing the key.
pub async fn auth_mw(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.api_key.as_deref() else {
        return next.run(req).await;
    };
    if exempt(req.uri().path()) {
        return next.run(req).await;
    }

    match req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        None => {
            debug!(path = req.uri().path(), "request without API key");
            ApiError(ServiceError::Unauthenticated).into_response()
        }
        Some(presented) if presented != expected => {
            debug!(path = req.uri().path(), "request with wrong API key");
            ApiError(ServiceError::Forbidden).into_response()
        }
        Some(_) => next.run(req).await,
    }
}
