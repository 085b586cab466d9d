//! End-to-end tests against a live listener.

use std::sync::Arc;
use std::time::{Duration, Instant};

use murmur_audio::wav::test_support::generate_wav;
use murmur_jobs::{JobQueue, JobQueueConfig};
use murmur_recognize::{AdapterConfig, MockRecognizer, RecognizerAdapter};
use murmur_segment::SegmenterConfig;
use murmur_session::{SessionConfig, SessionManager};
use murmur_server::config::ServerConfig;
use murmur_server::metrics::install_recorder;
use murmur_server::ratelimit::FixedWindowLimiter;
use murmur_server::runner::TranscribeRunner;
use murmur_server::service::TranscriptionService;
use murmur_server::shutdown::ShutdownCoordinator;
use murmur_server::{AppState, MurmurServer};

fn make_state(config: ServerConfig) -> AppState {
    let adapter = RecognizerAdapter::new(
        Arc::new(MockRecognizer::new()),
        AdapterConfig {
            retry_delay_ms: 1,
            tmp_dir: std::env::temp_dir().join("murmur-integration"),
            ..AdapterConfig::default()
        },
    );
    let svc = TranscriptionService::new(
        adapter,
        SegmenterConfig::default(),
        Arc::new(murmur_text::PersonalDictionary::with_defaults()),
        None,
        config.pipeline_concurrency,
    );
    let jobs = JobQueue::new(
        JobQueueConfig::default(),
        Arc::new(TranscribeRunner::new(svc.clone())),
    );
    let shutdown = Arc::new(ShutdownCoordinator::new());
    for handle in jobs.spawn_workers() {
        shutdown.register_task(handle);
    }
    let sessions = SessionManager::new(SessionConfig::default());
    shutdown.register_task(sessions.spawn_reaper(shutdown.token()));

    AppState {
        sessions,
        jobs,
        svc,
        limiter: Arc::new(FixedWindowLimiter::new()),
        shutdown,
        start_time: Instant::now(),
        config,
        metrics_handle: Arc::new(install_recorder()),
    }
}

async fn spawn_server() -> (String, AppState, tokio::task::JoinHandle<()>) {
    let state = make_state(ServerConfig::default());
    let server = MurmurServer::new(state.clone());
    let (addr, handle) = server.listen().await.unwrap();
    (format!("http://{addr}"), state, handle)
}

/// 200 Hz tone as 16 kHz mono WAV bytes.
fn speech_wav(seconds: f32) -> Vec<u8> {
    let n = (seconds * 16_000.0) as usize;
    let samples: Vec<i16> = (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16_000.0;
            (phase.sin() * 8000.0) as i16
        })
        .collect();
    generate_wav(16_000, 1, &samples)
}

#[tokio::test]
async fn health_over_the_wire() {
    let (base, state, handle) = spawn_server().await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    state.shutdown.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn session_flow_over_the_wire() {
    let (base, state, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{base}/api/asr/start"))
        .json(&serde_json::json!({"app_hint": "Notes|com.example.notes"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_owned();

    for _ in 0..3 {
        let resp = client
            .post(format!("{base}/api/asr/audio/{session_id}"))
            .header("content-type", "application/octet-stream")
            .body(vec![0u8; 32_000])
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let body: serde_json::Value = client
        .post(format!("{base}/api/asr/stop/{session_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["total_chunks"], 3);

    state.shutdown.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn upload_and_job_flow_over_the_wire() {
    let (base, state, handle) = spawn_server().await;
    let client = reqwest::Client::new();
    let wav = speech_wav(2.0);

    // Short upload.
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(wav.clone()).file_name("clip.wav"),
    );
    let resp = client
        .post(format!("{base}/api/postprocess/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success(), "upload failed: {}", resp.status());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["filename"], "clip.wav");
    assert!(body["transcript"].as_str().is_some());

    // Job queue round trip.
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(wav).file_name("long.wav"),
    );
    let resp = client
        .post(format!("{base}/api/jobs/submit"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    let job_id = body["job_id"].as_str().unwrap().to_owned();
    assert_eq!(body["status"], "submitted");

    let mut completed = None;
    for _ in 0..200 {
        let body: serde_json::Value = client
            .get(format!("{base}/api/jobs/{job_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let status = body["status"].as_str().unwrap().to_owned();
        if status == "completed" {
            completed = Some(body);
            break;
        }
        assert_ne!(status, "failed", "job failed: {body}");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let body = completed.expect("job never completed");
    assert_eq!(body["progress"], 1.0);
    assert!(body["result"]["final_transcript"].as_str().is_some());

    // Stats reflect the finished job.
    let stats: serde_json::Value = client
        .get(format!("{base}/api/jobs/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["completed"], 1);

    state.shutdown.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn upload_with_unsupported_extension_is_rejected() {
    let (base, state, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![1u8, 2, 3]).file_name("notes.txt"),
    );
    let resp = client
        .post(format!("{base}/api/postprocess/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    state.shutdown.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn one_shot_transcribe_accepts_wav_and_pcm() {
    let (base, state, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    // WAV container, sniffed by the RIFF magic.
    let resp = client
        .post(format!("{base}/api/asr/transcribe"))
        .header("content-type", "application/octet-stream")
        .body(speech_wav(1.0))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["sample_rate"], 16_000);
    assert!(!body["transcript"].as_str().unwrap().is_empty());

    // Raw PCM silence.
    let resp = client
        .post(format!("{base}/api/asr/transcribe"))
        .header("content-type", "application/octet-stream")
        .body(vec![0u8; 32_000])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["transcript"], "");

    state.shutdown.shutdown();
    let _ = handle.await;
}
