//! # murmur-core
//!
//! Shared foundation for the murmur speech-to-text service:
//!
//! - [`ids`]: branded ID newtypes (UUID v7, time-ordered)
//! - [`error`]: the surface-visible error taxonomy shared by every subsystem
//! - [`language`]: language hints accepted on the request surface
//! - [`retry`]: backoff calculation for the recognizer adapter

#![deny(unsafe_code)]

pub mod error;
pub mod ids;
pub mod language;
pub mod retry;

pub use error::{ServiceError, ServiceResult};
pub use ids::{JobId, SessionId};
pub use language::Language;
