//! # murmur-server
//!
//! The wire surface of the murmur service.
//!
//! - REST endpoints for sessions, one-shot transcription, uploads, text
//!   post-processing, dictionary admin, and the job queue
//! - the `/api/asr/stream-progress` WebSocket protocol with per-segment
//!   progress events
//! - fixed-window rate limiting per endpoint class and client address
//! - optional `X-API-Key` admission control
//! - `/health`, `/version`, and Prometheus `/metrics`
//! - graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod ratelimit;
pub mod routes;
pub mod runner;
pub mod server;
pub mod service;
pub mod shutdown;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use server::MurmurServer;
pub use state::AppState;
