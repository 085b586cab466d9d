//! The `/api/asr/stream-progress` WebSocket protocol.
//!
//! Client → server: JSON text frames with an `action` field (`start`,
//! `process`, `stop`) or binary frames of raw PCM. Server → client: JSON
//! text frames with a `type` field, ordered
//! `started → ready → chunk_received* → (progress / segment_complete)* →
//! complete | error`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use murmur_audio::pcm::duration_secs;
use murmur_pipeline::{ProgressSink, ProgressUpdate};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::service::TranscribeOptions;
use crate::state::AppState;

/// GET `/api/asr/stream-progress` upgrade handler.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let max = state.config.max_ws_message_bytes;
    ws.max_message_size(max)
        .on_upgrade(move |socket| run_stream(socket, state))
}

/// Forwards pipeline progress as `progress` + `segment_complete` events.
struct WsProgressSink {
    tx: mpsc::Sender<String>,
    session_id: String,
}

#[async_trait]
impl ProgressSink for WsProgressSink {
    async fn report(&self, update: ProgressUpdate) {
        #[allow(clippy::cast_precision_loss)]
        let percent = update.current as f64 / update.total.max(1) as f64 * 100.0;
        let progress = json!({
            "type": "progress",
            "current_segment": update.current,
            "total_segments": update.total,
            "progress_percent": percent,
            "message": update.message,
            "session_id": self.session_id,
        });
        let segment = json!({
            "type": "segment_complete",
            "current_segment": update.current,
            "total_segments": update.total,
            "transcript_part": update.segment_text,
            "session_id": self.session_id,
        });
        let _ = self.tx.send(progress.to_string()).await;
        let _ = self.tx.send(segment.to_string()).await;
    }
}

fn error_event(session_id: &str, message: &str) -> String {
    json!({
        "type": "error",
        "message": message,
        "session_id": session_id,
    })
    .to_string()
}

/// Run one streaming session from upgrade to close.
#[instrument(skip_all)]
async fn run_stream(socket: WebSocket, state: AppState) {
    metrics::gauge!(crate::metrics::WS_STREAMS_ACTIVE).increment(1.0);
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(256);

    // Outbound forwarder: everything the protocol emits funnels through
    // one channel so the pipeline can report progress concurrently.
    let outbound = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let session_id = match state.sessions.open(None) {
        Ok(id) => id.into_inner(),
        Err(e) => {
            let _ = out_tx.send(error_event("", &e.to_string())).await;
            drop(out_tx);
            let _ = outbound.await;
            metrics::gauge!(crate::metrics::WS_STREAMS_ACTIVE).decrement(1.0);
            return;
        }
    };
    info!(session_id, "streaming session connected");

    let _ = out_tx
        .send(
            json!({
                "type": "started",
                "session_id": session_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })
            .to_string(),
        )
        .await;

    let mut started = false;
    let mut processed = false;

    loop {
        let next = tokio::time::timeout(state.config.ws_idle_timeout, ws_rx.next()).await;
        let msg = match next {
            Err(_) => {
                debug!(session_id, "streaming session idle timeout");
                if !processed {
                    let _ = out_tx
                        .send(error_event(&session_id, "idle timeout"))
                        .await;
                }
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(_))) => break,
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => {
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    let _ = out_tx
                        .send(error_event(&session_id, "malformed JSON frame"))
                        .await;
                    break;
                };
                match request.get("action").and_then(Value::as_str) {
                    Some("start") => {
                        if !started {
                            started = true;
                            let _ = out_tx
                                .send(
                                    json!({
                                        "type": "ready",
                                        "session_id": session_id,
                                        "message": "ready to receive audio chunks",
                                    })
                                    .to_string(),
                                )
                                .await;
                        }
                    }
                    Some("process") => {
                        if processed {
                            // `complete` already went out; this stream owes
                            // exactly one terminal event.
                            break;
                        }
                        match process_audio(&state, &session_id, &request, &out_tx).await {
                            Ok(()) => processed = true,
                            Err(message) => {
                                let _ = out_tx.send(error_event(&session_id, &message)).await;
                                break;
                            }
                        }
                    }
                    Some("stop") => {
                        if !processed {
                            // Stop without process: one pass over the whole
                            // buffer with the defaults.
                            let request = json!({"apply_postprocess": false});
                            if let Err(message) =
                                process_audio(&state, &session_id, &request, &out_tx).await
                            {
                                let _ = out_tx.send(error_event(&session_id, &message)).await;
                            }
                        }
                        break;
                    }
                    _ => {
                        let _ = out_tx
                            .send(error_event(&session_id, "unknown action"))
                            .await;
                        break;
                    }
                }
            }
            Message::Binary(data) => {
                if processed {
                    continue;
                }
                if !started {
                    let _ = out_tx
                        .send(error_event(&session_id, "send a start action before audio"))
                        .await;
                    break;
                }
                match state.sessions.ingest(&session_id, &data).await {
                    Ok(ack) => {
                        let _ = out_tx
                            .send(
                                json!({
                                    "type": "chunk_received",
                                    "chunk_number": ack.chunks_received,
                                    "session_id": session_id,
                                })
                                .to_string(),
                            )
                            .await;
                    }
                    Err(e) => {
                        let _ = out_tx.send(error_event(&session_id, &e.to_string())).await;
                        break;
                    }
                }
            }
            Message::Close(_) => {
                debug!(session_id, "client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Discard anything left behind; a processed session is already terminal.
    if !processed {
        let _ = state.sessions.cancel(&session_id).await;
    }
    info!(session_id, "streaming session closed");

    drop(out_tx);
    let _ = outbound.await;
    metrics::gauge!(crate::metrics::WS_STREAMS_ACTIVE).decrement(1.0);
}

/// Run the accumulated audio through the pipeline, emitting progress along
/// the way and exactly one `complete` event on success.
async fn process_audio(
    state: &AppState,
    session_id: &str,
    request: &Value,
    out_tx: &mpsc::Sender<String>,
) -> Result<(), String> {
    let strategy = request
        .get("strategy")
        .and_then(Value::as_str)
        .unwrap_or("hybrid")
        .parse()
        .map_err(|e: murmur_core::ServiceError| e.to_string())?;
    let merge_strategy = request
        .get("merge_strategy")
        .and_then(Value::as_str)
        .unwrap_or("simple")
        .parse()
        .map_err(|e: murmur_core::ServiceError| e.to_string())?;
    let apply_postprocess = request
        .get("apply_postprocess")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let ctx = state
        .sessions
        .begin_stop(session_id)
        .await
        .map_err(|e| e.to_string())?;
    if ctx.samples.is_empty() {
        return Err("no audio chunks received".into());
    }
    let duration = duration_secs(ctx.samples.len());

    let sink = Arc::new(WsProgressSink {
        tx: out_tx.clone(),
        session_id: session_id.to_owned(),
    });
    let opts = TranscribeOptions {
        strategy,
        merge_strategy,
        language: murmur_core::Language::Auto,
    };

    let output = state
        .svc
        .transcribe(ctx.samples, &opts, sink, ctx.cancel.clone())
        .await
        .map_err(|e| {
            warn!(session_id, error = %e, "streaming transcription failed");
            e.to_string()
        })?;

    let processed_transcript = if apply_postprocess && !output.final_transcript.is_empty() {
        let outcome = state
            .svc
            .postprocess(
                &output.final_transcript,
                state.svc.default_mode(),
                ctx.app_hint.as_deref(),
                &output.paragraph_hints,
            )
            .await;
        Some(outcome.text)
    } else {
        None
    };

    let stored = processed_transcript
        .clone()
        .unwrap_or_else(|| output.final_transcript.clone());
    let _ = state.sessions.complete_stop(session_id, &stored).await;

    let _ = out_tx
        .send(
            json!({
                "type": "complete",
                "session_id": session_id,
                "final_transcript": output.final_transcript,
                "processed_transcript": processed_transcript,
                "total_segments": output.per_segment.len(),
                "duration": duration,
                "strategy": opts.strategy.as_str(),
                "merge_strategy": opts.merge_strategy.as_str(),
            })
            .to_string(),
        )
        .await;
    Ok(())
}
