//! Relay client configuration and CLI argument parsing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::relay::EndpointProfile;
use crate::types::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, SERVER_LANGUAGE, speed_in_range};

/// Default synthesis server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default synthesis server port (GPU server; 7860 was the CPU container).
pub const DEFAULT_PORT: u16 = 7861;

/// Default base timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 60;

/// Smallest accepted base timeout in seconds.
pub const MIN_TIMEOUT: u64 = 10;

/// Hard cap on any request deadline in seconds.
pub const MAX_TIMEOUT: u64 = 300;

/// Live relay settings. Snapshots are published through [`super::ConfigStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayOptions {
    pub host: String,
    pub port: u16,
    /// Speed used when a request omits one or asks for an out-of-range value.
    pub default_speed: f32,
    /// Speaker used when a request omits one.
    pub default_speaker: Option<String>,
    /// Base allowance before per-character time is added.
    pub base_timeout_secs: u64,
    pub profile: EndpointProfile,
    /// Language name sent to unified-profile servers.
    pub language: String,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_speed: DEFAULT_SPEED,
            default_speaker: None,
            base_timeout_secs: DEFAULT_TIMEOUT,
            profile: EndpointProfile::default(),
            language: SERVER_LANGUAGE.to_string(),
        }
    }
}

impl RelayOptions {
    /// Base URL of the synthesis server.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Validate and normalize in place.
    ///
    /// Base timeout is clamped into `[MIN_TIMEOUT, MAX_TIMEOUT]`; a blank default speaker becomes `None`.
    ///
    /// # Errors
    /// Returns an error if the host is empty or unusable in a URL, or the default speed is out of range.
    pub fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("Host must not be empty");
        }

        Url::parse(&self.base_url()).with_context(|| format!("Invalid server address {}:{}", self.host, self.port))?;

        if !speed_in_range(self.default_speed) {
            anyhow::bail!("Default speed must be between {:.1} and {:.1}, got {}", MIN_SPEED, MAX_SPEED, self.default_speed);
        }

        self.base_timeout_secs = self.base_timeout_secs.clamp(MIN_TIMEOUT, MAX_TIMEOUT);

        if self.default_speaker.as_deref().is_some_and(|s| s.trim().is_empty()) {
            self.default_speaker = None;
        }

        Ok(())
    }
}

/// Relay client configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "tts-relay")]
#[command(author, version, about = "Relay text to a Qwen3 TTS server and save the audio", long_about = None)]
pub struct RelayConfig {
    /// List the voices advertised by the server and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Only run the server health check and exit
    #[arg(long)]
    pub check: bool,

    /// TTS server host
    #[arg(long, short = 'H', env = "QWEN3_TTS_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// TTS server port
    #[arg(long, short = 'P', env = "QWEN3_TTS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Default speech speed (0.5-2.0)
    #[arg(long, default_value_t = DEFAULT_SPEED, value_parser = parse_speed)]
    pub default_speed: f32,

    /// Default speaker used when --speaker is not given
    #[arg(long, env = "QWEN3_TTS_SPEAKER")]
    pub default_speaker: Option<String>,

    /// Base timeout in seconds (10-300); 0.1s per character is added on top
    #[arg(long, short = 't', default_value_t = DEFAULT_TIMEOUT, value_parser = clap::value_parser!(u64).range(MIN_TIMEOUT..=MAX_TIMEOUT))]
    pub timeout: u64,

    /// Endpoint contract the server exposes
    #[arg(long, value_enum, default_value_t = EndpointProfile::default())]
    pub profile: EndpointProfile,

    /// Language name sent with unified-profile requests
    #[arg(long, default_value = SERVER_LANGUAGE)]
    pub language: String,

    /// Speaker for this request
    #[arg(long, short = 's')]
    pub speaker: Option<String>,

    /// Speed for this request (out-of-range values fall back to --default-speed)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Where to write the received audio
    #[arg(long, short = 'o', default_value = "output.wav")]
    pub output: PathBuf,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Text to synthesize
    pub text: Option<String>,
}

impl RelayConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Build the initial relay options from the command line.
    pub fn options(&self) -> Result<RelayOptions> {
        let mut options = RelayOptions {
            host: self.host.clone(),
            port: self.port,
            default_speed: self.default_speed,
            default_speaker: self.default_speaker.clone(),
            base_timeout_secs: self.timeout,
            profile: self.profile,
            language: self.language.clone(),
        };
        options.normalize()?;
        Ok(options)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.list_voices && !self.check && self.text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            anyhow::bail!("Text to synthesize is required (or use --list-voices / --check)");
        }
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Server: {}:{}", self.host, self.port);
        info!("  Profile: {}", self.profile);
        info!("  Default speed: {}", self.default_speed);
        if let Some(ref speaker) = self.default_speaker {
            info!("  Default speaker: {}", speaker);
        }
        info!("  Base timeout: {}s", self.timeout);
        info!("  Output: {}", self.output.display());
    }
}

/// Parse and validate a speed value (0.5-2.0).
fn parse_speed(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a valid float", s))?;
    if speed_in_range(value) {
        Ok(value)
    } else {
        Err(format!("speed must be between {:.1} and {:.1}, got {}", MIN_SPEED, MAX_SPEED, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps_timeout() {
        let mut options = RelayOptions { base_timeout_secs: 5, ..Default::default() };
        options.normalize().unwrap();
        assert_eq!(options.base_timeout_secs, MIN_TIMEOUT);

        options.base_timeout_secs = 1000;
        options.normalize().unwrap();
        assert_eq!(options.base_timeout_secs, MAX_TIMEOUT);
    }

    #[test]
    fn test_normalize_rejects_bad_speed() {
        let mut options = RelayOptions { default_speed: 3.0, ..Default::default() };
        assert!(options.normalize().is_err());
    }

    #[test]
    fn test_blank_default_speaker_is_none() {
        let mut options = RelayOptions { default_speaker: Some("  ".into()), ..Default::default() };
        options.normalize().unwrap();
        assert_eq!(options.default_speaker, None);
    }

    #[test]
    fn test_normalize_rejects_unusable_host() {
        let mut options = RelayOptions { host: "bad host".into(), ..Default::default() };
        assert!(options.normalize().is_err());

        let mut options = RelayOptions { host: "tts.local".into(), ..Default::default() };
        assert!(options.normalize().is_ok());
    }

    #[test]
    fn test_base_url() {
        assert_eq!(RelayOptions::default().base_url(), "http://localhost:7861");
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("1.5"), Ok(1.5));
        assert!(parse_speed("2.1").is_err());
        assert!(parse_speed("fast").is_err());
    }

    #[test]
    fn test_cli_timeout_range() {
        assert!(RelayConfig::try_parse_from(["tts-relay", "--timeout", "5", "hi"]).is_err());
        assert!(RelayConfig::try_parse_from(["tts-relay", "--timeout", "301", "hi"]).is_err());
        let config = RelayConfig::try_parse_from(["tts-relay", "--timeout", "120", "hi"]).unwrap();
        assert_eq!(config.options().unwrap().base_timeout_secs, 120);
    }

    #[test]
    fn test_text_required() {
        let config = RelayConfig::try_parse_from(["tts-relay"]).unwrap();
        assert!(config.validate().is_err());
        let config = RelayConfig::try_parse_from(["tts-relay", "--check"]).unwrap();
        assert!(config.validate().is_ok());
    }
}
