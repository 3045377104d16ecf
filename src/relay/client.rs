//! Relay client for the synthesis server.
//!
//! Turns one text into exactly one HTTP call under a length-scaled deadline, and every
//! outcome into either audio bytes or a classified [`TtsError`]. Nothing is retried; the
//! caller decides what to do with a failure.

use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::profile::{ResolvedSpeaker, SpeakerSource};
use super::timeout::TimeoutEstimator;
use crate::config::{ConfigStore, RelayOptions};
use crate::config::voices::DEFAULT_VOICE;
use crate::error::{TtsError, TtsResult};
use crate::types::{MAX_SPEED, MIN_SPEED, speed_in_range};

/// Deadline for the startup health check.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for fetching the speaker list.
pub const SPEAKERS_TIMEOUT: Duration = Duration::from_secs(30);

/// Language codes the relay advertises to its callers (Qwen3-TTS supports 10 languages).
pub const SUPPORTED_LANGUAGES: &[&str] = &["zh", "en", "ja", "ko", "de", "fr", "ru", "pt", "es", "it"];

/// Language advertised as the default.
pub const DEFAULT_LANGUAGE: &str = "zh";

/// Per-request options a caller may set.
pub const SUPPORTED_OPTIONS: &[&str] = &["speed", "speaker"];

/// Container format of the audio returned by the server.
pub const AUDIO_FORMAT: &str = "wav";

/// Per-request overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TtsOptions {
    pub speaker: Option<String>,
    pub speed: Option<f32>,
}

/// Audio received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsAudio {
    /// Container format (always `wav`).
    pub format: &'static str,
    pub data: Vec<u8>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub supported_speakers: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Deserialize)]
struct SpeakerEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpeakerList {
    #[serde(default)]
    speakers: Vec<SpeakerEntry>,
}

/// HTTP relay to a Qwen3 TTS server.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client, // Shared connection pool, no global timeout
    store: ConfigStore,    // Live options, re-read on every call
    estimator: TimeoutEstimator,
}

impl RelayClient {
    /// Create a new relay client.
    ///
    /// # Arguments
    /// * `store` - Live relay configuration
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend initialization).
    pub fn new(store: ConfigStore) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let estimator = TimeoutEstimator::new(store.clone());
        Ok(Self { http, store, estimator })
    }

    /// The configuration store this client reads from.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Languages the relay advertises.
    pub fn supported_languages(&self) -> &'static [&'static str] {
        SUPPORTED_LANGUAGES
    }

    pub fn default_language(&self) -> &'static str {
        DEFAULT_LANGUAGE
    }

    pub fn supported_options(&self) -> &'static [&'static str] {
        SUPPORTED_OPTIONS
    }

    /// Default option values: speed always, speaker only when one is configured.
    pub fn default_options(&self) -> serde_json::Value {
        let options = self.store.current();
        match options.default_speaker {
            Some(speaker) => json!({ "speed": options.default_speed, "speaker": speaker }),
            None => json!({ "speed": options.default_speed }),
        }
    }

    /// Resolve the speaker: request option, then configured default, then the built-in fallback.
    pub fn resolve_speaker(&self, requested: Option<&str>) -> ResolvedSpeaker {
        speaker_from(&self.store.current(), requested)
    }

    /// Resolve the speed: the requested value if in range, otherwise the configured default.
    pub fn resolve_speed(&self, requested: Option<f32>) -> f32 {
        speed_from(&self.store.current(), requested)
    }

    /// Synthesize `message`, collapsing every failure into `None`.
    ///
    /// Failures are logged with their kind before being collapsed.
    pub async fn get_tts_audio(&self, message: &str, options: &TtsOptions) -> Option<TtsAudio> {
        self.synthesize(message, options).await.ok()
    }

    /// Synthesize `message` and return the classified outcome.
    ///
    /// # Errors
    /// `InvalidRequest` (unusable server URL), `Timeout`, `Connectivity`, `Server` or
    /// `EmptyAudio`; each is logged here.
    pub async fn synthesize(&self, message: &str, options: &TtsOptions) -> TtsResult<TtsAudio> {
        // One snapshot per request, so a concurrent update cannot mix settings.
        let config = self.store.current();
        let speaker = speaker_from(&config, options.speaker.as_deref());
        let speed = speed_from(&config, options.speed);

        let text_length = message.chars().count();
        let deadline = self.estimator.deadline_with_base(text_length, config.base_timeout_secs);

        let url = config.profile.synthesis_url(&config.base_url(), message, &speaker, speed, &config.language).inspect_err(|e| {
            error!(kind = e.kind(), "Cannot build TTS request for {}: {}", config.base_url(), e);
        })?;

        debug!(
            "Requesting TTS: {} (speaker: {}, speed: {:.2}, timeout: {:.1}s for {} chars, base: {}s)",
            message.chars().take(50).collect::<String>(),
            speaker.name,
            speed,
            deadline.as_secs_f64(),
            text_length,
            config.base_timeout_secs
        );

        self.post_audio(url, deadline).await
    }

    /// Issue the synthesis call under `deadline` and classify the outcome.
    pub(crate) async fn post_audio(&self, url: Url, deadline: Duration) -> TtsResult<TtsAudio> {
        let endpoint = format!("{}{}", url.origin().ascii_serialization(), url.path());

        let call = async {
            let response = self.http.post(url).send().await.map_err(|e| TtsError::from_transport(e, deadline))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_else(|e| format!("<unreadable body: {}>", e));
                return Err(TtsError::Server { status: status.as_u16(), body });
            }

            let data = response.bytes().await.map_err(|e| TtsError::from_transport(e, deadline))?;
            if data.is_empty() {
                return Err(TtsError::EmptyAudio);
            }

            Ok(TtsAudio { format: AUDIO_FORMAT, data: data.to_vec() })
        };

        let result = tokio::time::timeout(deadline, call).await.unwrap_or(Err(TtsError::Timeout(deadline)));

        match &result {
            Ok(audio) => debug!("Successfully received TTS audio ({} bytes)", audio.data.len()),
            Err(e @ TtsError::Server { status, body }) => {
                error!(kind = e.kind(), "TTS request failed with status {}: {}", status, body);
            }
            Err(e @ TtsError::Timeout(_)) => {
                error!(kind = e.kind(), "⏱️ Timeout waiting for TTS response from {} ({:.1}s deadline)", endpoint, deadline.as_secs_f64());
            }
            Err(e @ TtsError::EmptyAudio) => error!(kind = e.kind(), "Received empty audio data from TTS server"),
            Err(e) => error!(kind = e.kind(), "Error communicating with TTS server at {}: {}", endpoint, e),
        }

        result
    }

    /// Fetch the speakers the server advertises.
    ///
    /// Advisory only: any failure, or an empty list, yields `None`.
    pub async fn get_speakers(&self) -> Option<Vec<String>> {
        let url = format!("{}/api/list_speakers", self.store.current().base_url());

        let call = async {
            let response = self.http.get(&url).send().await.map_err(|e| TtsError::from_transport(e, SPEAKERS_TIMEOUT))?;
            let status = response.status();
            if !status.is_success() {
                return Err(TtsError::Server { status: status.as_u16(), body: String::new() });
            }
            let body = response.bytes().await.map_err(|e| TtsError::from_transport(e, SPEAKERS_TIMEOUT))?;
            serde_json::from_slice::<SpeakerList>(&body).map_err(|e| TtsError::MalformedResponse(format!("speaker list: {}", e)))
        };

        match tokio::time::timeout(SPEAKERS_TIMEOUT, call).await.unwrap_or(Err(TtsError::Timeout(SPEAKERS_TIMEOUT))) {
            Ok(list) => {
                let speakers: Vec<String> = list.speakers.into_iter().map(|s| s.name).collect();
                debug!("Available speakers: {:?}", speakers);
                if speakers.is_empty() { None } else { Some(speakers) }
            }
            Err(TtsError::Server { status, .. }) => {
                warn!(kind = "server", "Failed to get speakers list: status {}", status);
                None
            }
            Err(e) => {
                warn!(kind = e.kind(), "Error fetching speakers list: {}", e);
                None
            }
        }
    }

    /// Verify the server is reachable and has its model loaded.
    ///
    /// # Errors
    /// `Timeout`, `Connectivity`, `Server` (non-200), `MalformedResponse` or `Unhealthy`.
    pub async fn check_health(&self) -> TtsResult<HealthReport> {
        let config = self.store.current();
        let url = format!("{}/health", config.base_url());

        let call = async {
            let response = self.http.get(&url).send().await.map_err(|e| TtsError::from_transport(e, HEALTH_TIMEOUT))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TtsError::Server { status: status.as_u16(), body });
            }
            let body = response.bytes().await.map_err(|e| TtsError::from_transport(e, HEALTH_TIMEOUT))?;
            serde_json::from_slice::<HealthReport>(&body).map_err(|e| TtsError::MalformedResponse(format!("health report: {}", e)))
        };

        let report = tokio::time::timeout(HEALTH_TIMEOUT, call).await.unwrap_or(Err(TtsError::Timeout(HEALTH_TIMEOUT))).inspect_err(|e| {
            error!(kind = e.kind(), "Health check against {}:{} failed: {}", config.host, config.port, e);
        })?;

        if !report.is_healthy() {
            error!(kind = "unhealthy", "TTS server at {}:{} reports status {}", config.host, config.port, report.status);
            return Err(TtsError::Unhealthy(report.status));
        }

        info!("✅ Connected to TTS server at {}:{} (status: {})", config.host, config.port, report.status);
        Ok(report)
    }
}

/// Speaker resolution against one options snapshot.
fn speaker_from(options: &RelayOptions, requested: Option<&str>) -> ResolvedSpeaker {
    if let Some(name) = requested.filter(|s| !s.trim().is_empty()) {
        return ResolvedSpeaker { name: name.to_string(), source: SpeakerSource::Request };
    }

    if let Some(name) = options.default_speaker.as_deref().filter(|s| !s.trim().is_empty()) {
        return ResolvedSpeaker { name: name.to_string(), source: SpeakerSource::Configured };
    }

    ResolvedSpeaker { name: DEFAULT_VOICE.to_string(), source: SpeakerSource::Fallback }
}

/// Speed resolution against one options snapshot.
fn speed_from(options: &RelayOptions, requested: Option<f32>) -> f32 {
    let default_speed = options.default_speed;
    match requested {
        Some(speed) if speed_in_range(speed) => speed,
        Some(speed) => {
            warn!("Speed {:.2} is out of range ({:.1}-{:.1}), using default {:.1}", speed, MIN_SPEED, MAX_SPEED, default_speed);
            default_speed
        }
        None => default_speed,
    }
}
