//! WebSocket endpoint for voice client connections (spec §6).
//!
//! Flow, mirroring the teacher's `nodes::ws::node_ws` connect/loop shape:
//! 1. Client connects to `/v1/voice/ws`.
//! 2. Client sends `hello` with its `user_id`; the edge admits a session
//!    and replies `connected`.
//! 3. Bidirectional loop: client sends `audio_chunk`/`text`/`heartbeat`/
//!    `interrupt`/`settings`; the edge streams back `transcription`,
//!    `voice_response`, `tts_chunk`, `streaming_complete` or
//!    `streaming_interrupted`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use mv_domain::frame::{ClientFrame, ServerFrame};
use mv_domain::trace::TraceEvent;
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::transcribe;

/// GET /v1/voice/ws — upgrade to WebSocket.
pub async fn voice_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let Some((user_id, source)) = wait_for_hello(&mut ws_stream).await else {
        tracing::warn!("client disconnected before sending hello");
        return;
    };

    let session_id = match state.sessions.admit(&user_id, &source) {
        Ok(id) => id,
        Err(e) => {
            let _ = send_frame(&mut ws_sink, &ServerFrame::Error {
                code: "admission_failed".into(),
                message: e.to_string(),
            })
            .await;
            return;
        }
    };

    if send_frame(&mut ws_sink, &ServerFrame::Connected { session_id: session_id.clone() })
        .await
        .is_err()
    {
        tracing::warn!(session_id = %session_id, "failed to send connected frame");
        state.sessions.close(&session_id, "send_failed").await;
        return;
    }
    tracing::info!(session_id = %session_id, user_id = %user_id, "voice session connected");

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerFrame>(64);
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if send_frame(&mut ws_sink, &frame).await.is_err() {
                break;
            }
        }
    });

    let generation = Arc::new(AtomicU64::new(0));
    let mut audio_buffer: Vec<u8> = Vec::new();

    while let Some(Ok(msg)) = ws_stream.next().await {
        let Message::Text(text) = msg else {
            if let Message::Close(_) = msg {
                break;
            }
            continue;
        };
        let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) else {
            tracing::debug!(session_id = %session_id, "ignoring unparseable frame");
            continue;
        };

        match frame {
            ClientFrame::Hello { .. } => {}
            ClientFrame::Heartbeat { .. } => {
                state.sessions.touch_heartbeat(&session_id);
            }
            ClientFrame::Settings { .. } => {
                // Recognized settings (voice_type, speech_rate, vad_sensitivity,
                // interruption_enabled, use_audio_compression) are accepted but
                // don't change the simulated synthesis output; stored settings
                // support would layer in here without touching the agent graph.
                state.sessions.touch_heartbeat(&session_id);
            }
            ClientFrame::Interrupt { .. } => {
                generation.fetch_add(1, Ordering::SeqCst);
                let was_streaming = state.sessions.barge_in(&session_id);
                TraceEvent::BargeIn { session_id: session_id.clone(), discarded_chunks: 0 }.emit();
                if was_streaming {
                    let _ = outbound_tx.send(ServerFrame::StreamingInterrupted).await;
                }
            }
            ClientFrame::AudioChunk { data, is_final, .. } => {
                match base64_decode(&data) {
                    Ok(bytes) => audio_buffer.extend_from_slice(&bytes),
                    Err(_) => {
                        let _ = outbound_tx
                            .send(ServerFrame::Error {
                                code: "bad_audio_chunk".into(),
                                message: "audio_chunk.data is not valid base64".into(),
                            })
                            .await;
                        continue;
                    }
                }
                if !is_final {
                    continue;
                }
                let buffered = std::mem::take(&mut audio_buffer);
                match transcribe::transcribe(&buffered) {
                    Some(text) => {
                        let _ = outbound_tx.send(ServerFrame::Transcription { text: text.clone() }).await;
                        spawn_turn(&state, &session_id, text, &outbound_tx, &generation);
                    }
                    None => {
                        let _ = outbound_tx
                            .send(ServerFrame::Error {
                                code: "transcription_failed".into(),
                                message: "could not transcribe audio".into(),
                            })
                            .await;
                    }
                }
            }
            ClientFrame::Text { text, .. } => {
                spawn_turn(&state, &session_id, text, &outbound_tx, &generation);
            }
        }
    }

    writer.abort();
    state.sessions.close(&session_id, "client_disconnect").await;
    tracing::info!(session_id = %session_id, "voice session disconnected");
}

/// Run a turn on its own task so the read loop keeps polling `ws_stream`
/// while the agent graph runs and speech chunks stream out — otherwise an
/// `interrupt` frame sitting in the socket buffer can't be read (and
/// `barge_in` can't fire) until the turn has already finished.
fn spawn_turn(
    state: &AppState,
    session_id: &str,
    text: String,
    outbound_tx: &mpsc::Sender<ServerFrame>,
    generation: &Arc<AtomicU64>,
) {
    let state = state.clone();
    let session_id = session_id.to_string();
    let outbound_tx = outbound_tx.clone();
    let generation = generation.clone();
    tokio::spawn(async move {
        run_turn(&state, &session_id, &text, &outbound_tx, &generation).await;
    });
}

async fn run_turn(
    state: &AppState,
    session_id: &str,
    text: &str,
    outbound_tx: &mpsc::Sender<ServerFrame>,
    generation: &Arc<AtomicU64>,
) {
    let gen_at_start = generation.load(Ordering::SeqCst);
    let Some(output) = state.sessions.on_text_turn(session_id, text, true).await else {
        // Cancelled (barge-in) or deadline elapsed before producing a
        // response — spec §9: no response is emitted for that turn.
        return;
    };
    if generation.load(Ordering::SeqCst) != gen_at_start {
        return;
    }

    let _ = outbound_tx
        .send(ServerFrame::VoiceResponse {
            text: output.response_text,
            sentiment: output.sentiment,
            insights: output.key_insights,
        })
        .await;

    for chunk in output.speech_chunks {
        if generation.load(Ordering::SeqCst) != gen_at_start {
            return;
        }
        if outbound_tx
            .send(ServerFrame::TtsChunk { seq: chunk.seq, data: chunk.data, is_final: chunk.is_final })
            .await
            .is_err()
        {
            return;
        }
    }

    let _ = outbound_tx.send(ServerFrame::StreamingComplete).await;
}

/// Wait up to 10s for a `hello` frame, returning `(user_id, source)`.
async fn wait_for_hello(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<(String, String)> {
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(Ok(msg)) = stream.next().await {
            if let Message::Text(text) = msg {
                if let Ok(ClientFrame::Hello { user_id, source }) = serde_json::from_str::<ClientFrame>(&text) {
                    return Some((user_id, source.unwrap_or_else(|| "ws".to_string())));
                }
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

async fn send_frame(sink: &mut (impl SinkExt<Message> + Unpin), frame: &ServerFrame) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}

fn base64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.decode(data)
}
