//! # murmurd
//!
//! The murmur service daemon: wires the recognizer, session manager, job
//! queue, and HTTP/WebSocket server together and runs until interrupted.
//!
//! Exit codes: `0` clean shutdown, `1` configuration error, `2` bind
//! error, `3` model initialization failure.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use murmur_jobs::{JobQueue, JobQueueConfig};
use murmur_recognize::{AdapterConfig, MockRecognizer, Recognizer, RecognizerAdapter};
use murmur_segment::SegmenterConfig;
use murmur_server::config::ServerConfig;
use murmur_server::ratelimit::FixedWindowLimiter;
use murmur_server::runner::TranscribeRunner;
use murmur_server::service::TranscriptionService;
use murmur_server::shutdown::ShutdownCoordinator;
use murmur_server::{AppState, MurmurServer};
use murmur_session::{SessionConfig, SessionManager};
use murmur_text::enhance::{build_enhancer, EnhancerConfig};
use murmur_text::PersonalDictionary;
use tracing::{error, info};

const EXIT_OK: i32 = 0;
const EXIT_CONFIG: i32 = 1;
const EXIT_BIND: i32 = 2;
const EXIT_MODEL: i32 = 3;

/// murmur speech-to-text service daemon.
#[derive(Parser, Debug)]
#[command(name = "murmurd", about = "Local streaming speech-to-text service")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value_t = 8710)]
    port: u16,

    /// API key; enables the X-API-Key gate when set.
    #[arg(long)]
    api_key: Option<String>,

    /// Recognizer backend. `mock` is the built-in deterministic backend;
    /// real models plug in behind the same capability.
    #[arg(long, default_value = "mock")]
    recognizer: String,

    /// Enhancer provider: openai | gemini | ollama | none.
    #[arg(long, default_value = "none")]
    enhancer: String,

    /// Enhancer model override.
    #[arg(long)]
    enhancer_model: Option<String>,

    /// Enhancer base URL override (proxies, ollama host).
    #[arg(long)]
    enhancer_base_url: Option<String>,

    /// Concurrent jobs in the long-audio queue.
    #[arg(long, default_value_t = 3)]
    max_concurrent_jobs: usize,

    /// In-flight recognitions per pipeline invocation.
    #[arg(long, default_value_t = 1)]
    pipeline_concurrency: usize,

    /// Hybrid segmentation cap in seconds.
    #[arg(long, default_value_t = 20.0)]
    max_chunk_duration: f32,

    /// Runtime directory for temp WAVs and logs.
    #[arg(long, default_value = "runtime")]
    runtime_dir: PathBuf,

    /// Also write logs to daily files under `<runtime_dir>/logs`.
    #[arg(long, default_value_t = false)]
    log_to_file: bool,

    /// Disable fixed-window rate limiting.
    #[arg(long, default_value_t = false)]
    no_rate_limit: bool,
}

fn init_tracing(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if cli.log_to_file {
        let log_dir = cli.runtime_dir.join("logs");
        let appender = tracing_appender::rolling::daily(log_dir, "murmurd.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}

fn build_recognizer(cli: &Cli) -> Result<Arc<dyn Recognizer>, String> {
    match cli.recognizer.as_str() {
        "mock" => Ok(Arc::new(MockRecognizer::new())),
        other => Err(format!("unknown recognizer backend: {other:?}")),
    }
}

fn enhancer_api_key(provider: &str) -> Option<String> {
    match provider {
        "openai" => std::env::var("OPENAI_API_KEY").ok(),
        "gemini" => std::env::var("GEMINI_API_KEY").ok(),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

#[allow(clippy::too_many_lines)]
async fn run() -> i32 {
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli);

    // Enhancer (config error → 1).
    let enhancer_config = EnhancerConfig {
        provider: cli.enhancer.clone(),
        api_key: enhancer_api_key(&cli.enhancer),
        base_url: cli.enhancer_base_url.clone(),
        model: cli.enhancer_model.clone(),
    };
    let enhancer = match build_enhancer(&enhancer_config) {
        Ok(e) => e,
        Err(e) => {
            error!(error = %e, "enhancer configuration invalid");
            return EXIT_CONFIG;
        }
    };
    match &enhancer {
        Some(e) => info!(provider = e.provider(), "enhancer enabled"),
        None => info!("no enhancer configured"),
    }

    // Recognizer (unknown backend → 1, init failure → 3).
    let backend = match build_recognizer(&cli) {
        Ok(b) => b,
        Err(message) => {
            error!(message, "recognizer configuration invalid");
            return EXIT_CONFIG;
        }
    };
    let adapter = RecognizerAdapter::new(
        backend,
        AdapterConfig {
            tmp_dir: cli.runtime_dir.join("tmp"),
            ..AdapterConfig::default()
        },
    );
    if let Err(e) = adapter.init_now().await {
        error!(error = %e, "recognizer initialization failed");
        return EXIT_MODEL;
    }
    info!(backend = adapter.backend_name(), "recognizer ready");

    // Core services.
    let segmenter = SegmenterConfig {
        max_chunk_duration: cli.max_chunk_duration,
        ..SegmenterConfig::default()
    };
    let dictionary = Arc::new(PersonalDictionary::with_defaults());
    let svc = TranscriptionService::new(
        adapter,
        segmenter,
        dictionary,
        enhancer,
        cli.pipeline_concurrency.clamp(1, 3),
    );

    let shutdown = Arc::new(ShutdownCoordinator::new());

    let sessions = SessionManager::new(SessionConfig::default());
    shutdown.register_task(sessions.spawn_reaper(shutdown.token()));

    let jobs = JobQueue::new(
        JobQueueConfig {
            max_concurrent_jobs: cli.max_concurrent_jobs.max(1),
            ..JobQueueConfig::default()
        },
        Arc::new(TranscribeRunner::new(svc.clone())),
    );
    for handle in jobs.spawn_workers() {
        shutdown.register_task(handle);
    }

    let config = ServerConfig {
        host: cli.host.clone(),
        port: cli.port,
        api_key: cli.api_key.clone(),
        rate_limit_enabled: !cli.no_rate_limit,
        pipeline_concurrency: cli.pipeline_concurrency.clamp(1, 3),
        ..ServerConfig::default()
    };

    let state = AppState {
        sessions,
        jobs: jobs.clone(),
        svc,
        limiter: Arc::new(FixedWindowLimiter::new()),
        shutdown: shutdown.clone(),
        start_time: Instant::now(),
        config,
        metrics_handle: Arc::new(murmur_server::metrics::install_recorder()),
    };

    // Listen (bind error → 2).
    let server = MurmurServer::new(state);
    let (addr, server_handle) = match server.listen().await {
        Ok(bound) => bound,
        Err(e) => {
            error!(error = %e, host = %cli.host, port = cli.port, "failed to bind");
            return EXIT_BIND;
        }
    };
    shutdown.register_task(server_handle);
    info!(addr = %addr, "murmurd listening");

    // Run until interrupted.
    let shutdown_token = shutdown.token();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
        () = shutdown_token.cancelled() => {}
    }

    jobs.shutdown();
    shutdown.graceful_shutdown(None).await;
    info!("shutdown complete");
    EXIT_OK
}
