//! Surface-visible error taxonomy.
//!
//! Every subsystem maps its internal failures into [`ServiceError`] at its
//! boundary; the HTTP layer maps each kind to a status code. Enhancer
//! failures never appear here; they are absorbed by the post-processor and
//! logged, per the best-effort contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for fallible service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Machine-readable error codes carried on the wire.
pub mod codes {
    /// Malformed request: wrong PCM length, unknown enum value, bad body.
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    /// Unknown session or job.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Operation not allowed in the current state.
    pub const INVALID_STATE: &str = "INVALID_STATE";
    /// Missing or malformed API key.
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    /// Valid key without access to the resource.
    pub const FORBIDDEN: &str = "FORBIDDEN";
    /// Fixed-window quota exceeded.
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    /// Session buffer cap or queue admission refused.
    pub const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
    /// All segments failed, or the model failed to initialize.
    pub const RECOGNIZER_FAILED: &str = "RECOGNIZER_FAILED";
    /// Catch-all with an opaque message.
    pub const INTERNAL: &str = "INTERNAL";
}

/// Top-level error type for the murmur service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed request (wrong PCM length, unknown enum value, bad body).
    #[error("{0}")]
    InvalidInput(String),

    /// Unknown session or job.
    #[error("{0}")]
    NotFound(String),

    /// Operation not allowed in the current state.
    #[error("{0}")]
    InvalidState(String),

    /// Missing API key when auth is enabled.
    #[error("missing or invalid API key")]
    Unauthenticated,

    /// Key present but not permitted.
    #[error("access denied")]
    Forbidden,

    /// Fixed-window quota exceeded.
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited {
        /// Seconds until the current window resets.
        retry_after: u64,
    },

    /// Session buffer cap, session limit, or queue admission refused.
    #[error("{0}")]
    ResourceExhausted(String),

    /// Every segment failed, or the model failed to initialize.
    #[error("{0}")]
    RecognizerFailed(String),

    /// Catch-all; the message is opaque to clients.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => codes::INVALID_INPUT,
            Self::NotFound(_) => codes::NOT_FOUND,
            Self::InvalidState(_) => codes::INVALID_STATE,
            Self::Unauthenticated => codes::UNAUTHENTICATED,
            Self::Forbidden => codes::FORBIDDEN,
            Self::RateLimited { .. } => codes::RATE_LIMITED,
            Self::ResourceExhausted(_) => codes::RESOURCE_EXHAUSTED,
            Self::RecognizerFailed(_) => codes::RECOGNIZER_FAILED,
            Self::Internal(_) => codes::INTERNAL,
        }
    }

    /// Convert to the wire-format error body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_owned(),
            message: self.to_string(),
            retry_after: match self {
                Self::RateLimited { retry_after } => Some(*retry_after),
                _ => None,
            },
        }
    }

    /// Shorthand for an unknown-session error.
    #[must_use]
    pub fn session_not_found(id: &str) -> Self {
        Self::NotFound(format!("session {id} not found"))
    }

    /// Shorthand for an unknown-job error.
    #[must_use]
    pub fn job_not_found(id: &str) -> Self {
        Self::NotFound(format!("job {id} not found"))
    }
}

/// JSON error body returned by every failing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code (see [`codes`]).
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Seconds until retry is worthwhile (rate limiting only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}
