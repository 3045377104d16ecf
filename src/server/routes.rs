//! HTTP surface of the synthesis server.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::host::{ModelHost, ModelState};
use super::pipeline::{SynthesisOutput, Synthesizer};
use crate::audio::WAV_MIME;
use crate::config::voices::{DEFAULT_VOICE, voice_names};
use crate::error::TtsError;
use crate::types::{DEFAULT_SPEED, SERVER_LANGUAGE, SynthesisRequest};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    synthesizer: Arc<Synthesizer>,
}

impl AppState {
    pub fn new(synthesizer: Arc<Synthesizer>) -> Self {
        Self { synthesizer }
    }

    fn host(&self) -> &ModelHost {
        self.synthesizer.host()
    }
}

/// Query of `POST /api/tts`.
#[derive(Debug, Deserialize)]
struct TtsQuery {
    text: String,
    #[serde(default = "default_speed")]
    speed: f32,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    speaker: Option<String>,
}

/// Query of `POST /api/tts_to_speaker`.
#[derive(Debug, Deserialize)]
struct SpeakerQuery {
    text: String,
    speaker: String,
    #[serde(default = "default_speed")]
    speed: f32,
}

fn default_speed() -> f32 {
    DEFAULT_SPEED
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    state: ModelState,
    backend: Option<String>,
    supported_speakers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SpeakerEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct SpeakerList {
    speakers: Vec<SpeakerEntry>,
}

/// Build the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/tts", post(tts_handler))
        .route("/api/tts_to_speaker", post(tts_to_speaker_handler))
        .route("/api/list_speakers", get(list_speakers_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "Qwen3-TTS API",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.host().is_ready(),
        "backend": state.host().backend_name(),
        "endpoints": {
            "/health": "GET - Health check",
            "/api/tts": "POST - Text to speech (text, speed, language, speaker)",
            "/api/tts_to_speaker": "POST - Text to speech with an explicit speaker (text, speaker, speed)",
            "/api/list_speakers": "GET - List available speakers",
        },
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let host = state.host();
    let ready = host.is_ready();

    Json(HealthResponse {
        status: if ready { "healthy" } else { "unhealthy" },
        model_loaded: ready,
        state: host.state(),
        backend: host.backend_name().map(str::to_string),
        supported_speakers: voice_names(),
    })
}

async fn list_speakers_handler() -> Json<SpeakerList> {
    Json(SpeakerList { speakers: voice_names().into_iter().map(|name| SpeakerEntry { name }).collect() })
}

async fn tts_handler(State(state): State<AppState>, Query(query): Query<TtsQuery>) -> Response {
    let language = query.language.filter(|l| !l.trim().is_empty()).unwrap_or_else(|| SERVER_LANGUAGE.to_string());
    let speaker = query.speaker.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| DEFAULT_VOICE.to_string());

    synthesize(&state, query.text, speaker, query.speed, language).await
}

async fn tts_to_speaker_handler(State(state): State<AppState>, Query(query): Query<SpeakerQuery>) -> Response {
    synthesize(&state, query.text, query.speaker, query.speed, SERVER_LANGUAGE.to_string()).await
}

/// Shared body of both synthesis endpoints.
async fn synthesize(state: &AppState, text: String, speaker: String, speed: f32, language: String) -> Response {
    info!("📝 TTS request: \"{}\" (speaker={}, speed={}, language={})", text, speaker, speed, language);

    let request = match SynthesisRequest::new(text, speaker, speed, language) {
        Ok(request) => request,
        Err(e) => {
            warn!(kind = e.kind(), "Rejected TTS request: {}", e);
            return error_response(&e);
        }
    };

    // Dropping this handler (client disconnect) cancels generation at the next chunk.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.synthesizer.synthesize(request, cancel).await {
        Ok(output) => {
            info!(
                "✅ Generated {:.2}s of audio in {:.2}s (RTF {:.2}) -> {}",
                output.duration_secs,
                output.generation_time.as_secs_f64(),
                output.realtime_factor,
                output.path.display()
            );
            audio_response(output)
        }
        Err(e) => {
            error!(kind = e.kind(), "❌ TTS generation failed: {}", e);
            error_response(&e)
        }
    }
}

fn status_for(err: &TtsError) -> StatusCode {
    match err {
        TtsError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TtsError::ModelNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &TtsError) -> Response {
    (status_for(err), err.to_string()).into_response()
}

fn insert_metric(headers: &mut HeaderMap, name: &'static str, value: f64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn audio_response(output: SynthesisOutput) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(WAV_MIME));
    headers.insert(header::CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=\"output.wav\""));
    insert_metric(&mut headers, "x-generation-time", output.generation_time.as_secs_f64());
    insert_metric(&mut headers, "x-audio-duration", output.duration_secs);
    insert_metric(&mut headers, "x-realtime-factor", output.realtime_factor);

    (StatusCode::OK, headers, output.wav).into_response()
}
