//! `MurmurServer`: the Axum HTTP + WebSocket server.

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, instrument};

use crate::auth;
use crate::health::{self, HealthResponse, VersionResponse};
use crate::ratelimit;
use crate::routes::{asr, dictionary, jobs, postprocess};
use crate::state::AppState;
use crate::ws;

/// Generates UUIDv7 request IDs.
#[derive(Clone)]
struct UuidV7RequestId;

impl MakeRequestId for UuidV7RequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::now_v7().to_string();
        axum::http::HeaderValue::from_str(&id)
            .ok()
            .map(RequestId::new)
    }
}

/// The murmur HTTP/WebSocket server.
pub struct MurmurServer {
    state: AppState,
}

impl MurmurServer {
    /// Server over an assembled state.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// The shared state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes and middleware.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = self.state.clone();

        // Short-lived requests get the default timeout.
        let short = Router::new()
            .route("/api/asr/start", post(asr::start))
            .route("/api/asr/audio/{session_id}", post(asr::audio))
            .route("/api/asr/cancel/{session_id}", post(asr::cancel))
            .route("/api/asr/status/{session_id}", get(asr::status))
            .route("/api/asr/preview/{session_id}", get(asr::preview))
            .route(
                "/api/asr/dictionary",
                get(dictionary::list).post(dictionary::upsert),
            )
            .route("/api/asr/dictionary/{spoken}", delete(dictionary::remove))
            .route("/api/postprocess/text", post(postprocess::text))
            .route(
                "/api/postprocess/config",
                get(postprocess::get_config).post(postprocess::set_config),
            )
            .route("/api/jobs/", get(jobs::list))
            .route("/api/jobs/stats", get(jobs::stats))
            .route("/api/jobs/{job_id}", get(jobs::get))
            .route("/api/jobs/{job_id}/cancel", post(jobs::cancel))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.state.config.request_timeout,
            ));

        // Long-audio paths get the extended timeout.
        let long = Router::new()
            .route("/api/asr/stop/{session_id}", post(asr::stop))
            .route("/api/asr/transcribe", post(asr::transcribe))
            .route("/api/postprocess/upload", post(postprocess::upload))
            .route("/api/postprocess/upload-long", post(postprocess::upload_long))
            .route(
                "/api/postprocess/batch-transcribe",
                post(postprocess::batch_transcribe),
            )
            .route("/api/jobs/submit", post(jobs::submit))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.state.config.long_request_timeout,
            ));

        // Health surface and the WebSocket upgrade carry no timeout.
        Router::new()
            .route("/health", get(health_handler))
            .route("/version", get(version_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/asr/stream-progress", get(ws::ws_upgrade))
            .merge(short)
            .merge(long)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                ratelimit::rate_limit_mw,
            ))
            .layer(middleware::from_fn_with_state(state.clone(), auth::auth_mw))
            .with_state(state)
            // Outermost layers execute first on request, last on response.
            .layer(CatchPanicLayer::new())
            .layer(RequestBodyLimitLayer::new(self.state.config.body_limit))
            .layer(SetRequestIdLayer::x_request_id(UuidV7RequestId))
            .layer(PropagateRequestIdLayer::x_request_id())
    }

    /// Bind and start serving. Returns the bound address and the server
    /// task handle.
    #[instrument(skip_all, fields(host = %self.state.config.host, port = self.state.config.port))]
    pub async fn listen(&self) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), std::io::Error> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "server started");

        let router = self.router();
        let shutdown_token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("server shutdown initiated");
            })
            .await;
            info!("server shutdown complete");
        });

        Ok((bound_addr, handle))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.sessions.session_count(),
        state.jobs.stats().total_jobs,
        state.svc.recognizer.is_ready(),
    ))
}

/// GET /version
async fn version_handler(State(state): State<AppState>) -> Json<VersionResponse> {
    let enhancer = state
        .svc
        .enhancer
        .as_ref()
        .map_or_else(|| "none".to_owned(), |e| e.provider().to_owned());
    Json(health::version_info(
        state.svc.recognizer.backend_name().to_owned(),
        enhancer,
    ))
}

/// GET /metrics, Prometheus text format.
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}
