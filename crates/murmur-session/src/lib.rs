//! # murmur-session
//!
//! Lifecycle and concurrency-safe mutation of streaming sessions.
//!
//! The store is a map of `session_id → SessionHandle`; the map guard is
//! held only for lookup and insertion, never across I/O. Each handle wraps
//! its session in an async mutex, so operations on one session serialize
//! while different sessions proceed independently. A background reaper
//! expires idle sessions and drops terminal ones after their TTL.

#![deny(unsafe_code)]

mod manager;
mod state;

pub use manager::{
    IngestAck, SessionConfig, SessionManager, SessionSnapshot, StopContext, StopSummary,
};
pub use state::SessionState;
