//! Deployment profiles: which endpoint contract a synthesis server exposes.
//!
//! These are not negotiated at runtime. The relay is configured with the profile that
//! matches the server it talks to.

use clap::ValueEnum;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};

/// Where a resolved speaker came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerSource {
    /// Named in the request options.
    Request,
    /// The relay's configured default speaker.
    Configured,
    /// The hard-coded last-resort speaker.
    Fallback,
}

/// A speaker name plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpeaker {
    pub name: String,
    pub source: SpeakerSource,
}

/// Endpoint contract of the synthesis server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointProfile {
    /// One endpoint taking text, speed, language and speaker
    #[default]
    Unified,
    /// A default-voice endpoint plus a speaker-qualified endpoint
    Dual,
}

impl std::fmt::Display for EndpointProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointProfile::Unified => write!(f, "unified"),
            EndpointProfile::Dual => write!(f, "dual"),
        }
    }
}

impl EndpointProfile {
    /// Build the synthesis URL for this profile.
    ///
    /// # Arguments
    /// * `base_url` - Server base URL (`http://host:port`)
    /// * `text` - Text to synthesize
    /// * `speaker` - Resolved speaker
    /// * `speed` - Validated speed multiplier
    /// * `language` - Language name (unified profile only)
    pub fn synthesis_url(&self, base_url: &str, text: &str, speaker: &ResolvedSpeaker, speed: f32, language: &str) -> TtsResult<Url> {
        let speed = speed.to_string();

        let (path, params): (&str, Vec<(&str, &str)>) = match self {
            EndpointProfile::Unified => {
                ("/api/tts", vec![("text", text), ("speed", speed.as_str()), ("language", language), ("speaker", speaker.name.as_str())])
            }
            EndpointProfile::Dual if speaker.source == SpeakerSource::Fallback => ("/api/tts", vec![("text", text), ("speed", speed.as_str())]),
            EndpointProfile::Dual => ("/api/tts_to_speaker", vec![("text", text), ("speaker", speaker.name.as_str()), ("speed", speed.as_str())]),
        };

        Url::parse_with_params(&format!("{}{}", base_url, path), &params).map_err(|e| TtsError::invalid_request(format!("bad server URL {}: {}", base_url, e)))
    }
}
