//! Web endpoints for Neuromotion Capture.
//!
//! Thin I/O wrappers around the recording session: the start and save
//! control signals arrive as POSTs, samples arrive over a long-lived
//! WebSocket, and the capture UI is served as an embedded page. The
//! browser-side MediaPipe/Myo acquisition is an external producer; this
//! layer only consumes its envelopes.

use crate::ingest::{self, IngestError};
use crate::persist;
use crate::session::RecordingSession;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared state for web handlers.
///
/// The session is process-wide shared mutable state; every mutation
/// (start, append, snapshot+reset) happens inside one lock scope.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<RecordingSession>>,
    pub records_dir: Arc<PathBuf>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health))
        .route("/startRecording", post(start_recording))
        .route("/saveRecording", post(save_recording))
        .route("/streamRecordingToMemory", get(stream_recording_ws))
        .fallback(not_found)
        .with_state(state)
}

/// Serve the capture UI page.
async fn serve_index() -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(INDEX_HTML.to_string())
        .unwrap()
}

async fn not_found() -> impl IntoResponse {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(NOT_FOUND_HTML.to_string())
        .unwrap()
}

/// Health and session status.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (phase, landmark_samples, emg_samples) = match state.session.lock() {
        Ok(session) => {
            let (landmark, emg) = session.sample_counts();
            let phase = if session.is_recording() {
                "recording"
            } else {
                "idle"
            };
            (phase, landmark, emg)
        }
        Err(_) => ("poisoned", 0, 0),
    };

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "session": {
            "state": phase,
            "landmark_samples": landmark_samples,
            "emg_samples": emg_samples,
        }
    }))
}

/// Start signal payload, field name matching the browser client.
#[derive(Debug, Deserialize)]
struct StartRecording {
    #[serde(rename = "startedRecordingTime")]
    started_recording_time: f64,
}

/// Start signal: set the session epoch.
///
/// 204 on success, 409 if a recording is already in progress.
async fn start_recording(
    State(state): State<AppState>,
    Json(body): Json<StartRecording>,
) -> Response {
    let mut session = match state.session.lock() {
        Ok(s) => s,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "session lock poisoned").into_response()
        }
    };

    match session.start(body.started_recording_time) {
        Ok(()) => {
            tracing::info!(epoch = body.started_recording_time, "recording started");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::warn!("start signal rejected: {e}");
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
    }
}

/// Save signal: commit the session buffer to the next record file and
/// reset the session to idle.
///
/// Durability is synchronous blocking I/O, so the commit runs on the
/// blocking pool rather than an async worker. A failed commit leaves the
/// session buffer intact so the operator can retry the save.
async fn save_recording(State(state): State<AppState>) -> Response {
    let session = state.session.clone();
    let records_dir = state.records_dir.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut session = session
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "session lock poisoned".to_string()))?;

        if !session.is_recording() {
            return Err((
                StatusCode::CONFLICT,
                "no recording in progress".to_string(),
            ));
        }

        let record = session.snapshot();
        let path = persist::commit(&record, records_dir.as_path()).map_err(|e| {
            tracing::error!("commit failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

        // Only a durable commit clears the buffer.
        session.reset();
        Ok::<_, (StatusCode, String)>(path)
    })
    .await;

    match result {
        Ok(Ok(path)) => {
            tracing::info!("session committed to {}", path.display());
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(Err((status, message))) => (status, message).into_response(),
        Err(e) => {
            tracing::error!("commit task panicked: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// WebSocket handler for the inbound sample stream.
async fn stream_recording_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_sample_stream(socket, state))
}

/// Per-connection ingest loop.
///
/// Messages are processed strictly sequentially so append order equals
/// arrival order. Bad messages are logged and skipped; connection close or
/// a transport error simply ends the loop and never touches the buffer.
async fn handle_sample_stream(mut socket: WebSocket, state: AppState) {
    tracing::info!("sample stream connected");
    let mut buffered: u64 = 0;

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("sample stream transport error: {e}");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let mut session = match state.session.lock() {
                    Ok(s) => s,
                    Err(_) => {
                        tracing::error!("session lock poisoned, closing sample stream");
                        break;
                    }
                };

                match ingest::ingest_message(&mut session, &text) {
                    Ok(kind) => {
                        buffered += 1;
                        tracing::trace!(kind = kind.as_str(), "sample buffered");
                    }
                    Err(e @ IngestError::Session(_)) => {
                        tracing::warn!("sample rejected: {e}");
                    }
                    Err(e) => {
                        tracing::warn!("sample discarded: {e}");
                    }
                }
            }
            Message::Close(_) => break,
            // Binary, ping, and pong frames carry no envelopes.
            _ => {}
        }
    }

    tracing::info!(samples = buffered, "sample stream closed");
}

/// HTML for the capture UI.
///
/// Sensor acquisition (MediaPipe hand tracking, Myo EMG) runs entirely in
/// the browser; the page exposes `neuromotion.sendSample(kind, data)` for
/// the producer scripts and wires the start/save controls to the server.
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Neuromotion Capture</title>
  <style>
    :root { --bg: #1a1a2e; --card: #16213e; --accent: #e94560; --text: #eee; --muted: #888; }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg); color: var(--text); padding: 1rem; min-height: 100vh; }
    h1 { font-size: 1.5rem; margin-bottom: 1rem; }
    .panel { background: var(--card); padding: 1rem; border-radius: 8px; margin-bottom: 1rem; }
    button { background: var(--accent); border: none; color: white; padding: 0.5rem 1rem; border-radius: 4px; cursor: pointer; font-size: 0.9rem; margin-right: 0.5rem; }
    button:hover { opacity: 0.9; }
    button:disabled { background: #444; cursor: default; }
    .status { font-size: 0.85rem; color: var(--muted); margin-top: 0.5rem; }
    .counts { font-variant-numeric: tabular-nums; }
  </style>
</head>
<body>
  <h1>Neuromotion Capture</h1>

  <div class="panel">
    <button id="startBtn">Start Recording</button>
    <button id="saveBtn" disabled>Save Recording</button>
    <div class="status" id="status">Idle. Connect a producer, then start recording.</div>
    <div class="status counts" id="counts"></div>
  </div>

  <script>
    const statusEl = document.getElementById('status');
    const countsEl = document.getElementById('counts');
    const startBtn = document.getElementById('startBtn');
    const saveBtn = document.getElementById('saveBtn');
    let sent = { landmarkData: 0, emgData: 0 };

    const proto = location.protocol === 'https:' ? 'wss' : 'ws';
    const ws = new WebSocket(`${proto}://${location.host}/streamRecordingToMemory`);
    ws.onopen = () => { statusEl.textContent = 'Stream connected. Idle.'; };
    ws.onclose = () => { statusEl.textContent = 'Stream disconnected.'; };

    // Producer hook: acquisition scripts (MediaPipe hand landmarker, Myo
    // EMG driver) call this with their own clock's timestamp; the server
    // rebases it to session-relative time.
    window.neuromotion = {
      sendSample(kind, recordingData) {
        if (ws.readyState !== WebSocket.OPEN) return;
        ws.send(JSON.stringify({ type: kind, recordingData }));
        sent[kind] = (sent[kind] || 0) + 1;
        countsEl.textContent = `landmark: ${sent.landmarkData} · emg: ${sent.emgData}`;
      }
    };

    startBtn.onclick = async () => {
      const res = await fetch('/startRecording', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ startedRecordingTime: performance.now() / 1000 })
      });
      if (res.ok) {
        statusEl.textContent = 'Recording...';
        startBtn.disabled = true;
        saveBtn.disabled = false;
      } else {
        statusEl.textContent = `Start failed: ${await res.text()}`;
      }
    };

    saveBtn.onclick = async () => {
      const res = await fetch('/saveRecording', { method: 'POST' });
      if (res.ok) {
        statusEl.textContent = 'Session saved. Idle.';
        sent = { landmarkData: 0, emgData: 0 };
        countsEl.textContent = '';
        startBtn.disabled = false;
        saveBtn.disabled = true;
      } else {
        statusEl.textContent = `Save failed: ${await res.text()}`;
      }
    };
  </script>
</body>
</html>
"##;

const NOT_FOUND_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Not Found</title>
  <style>
    body { font-family: system-ui, sans-serif; background: #1a1a2e; color: #eee; display: grid; place-items: center; min-height: 100vh; margin: 0; }
    a { color: #e94560; }
  </style>
</head>
<body>
  <div>
    <h1>404</h1>
    <p>No such page. <a href="/">Back to capture</a>.</p>
  </div>
</body>
</html>
"##;
