//! Core request, chunk and result types for speech synthesis.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};

/// Slowest accepted speech rate.
pub const MIN_SPEED: f32 = 0.5;

/// Fastest accepted speech rate.
pub const MAX_SPEED: f32 = 2.0;

/// Speech rate used when nothing else is configured.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Sample rate of the Qwen3 and Kokoro decoders.
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// The only language the synthesis server operates in.
pub const SERVER_LANGUAGE: &str = "Chinese";

/// Check whether a speed multiplier is inside `[MIN_SPEED, MAX_SPEED]`.
pub fn speed_in_range(speed: f32) -> bool {
    (MIN_SPEED..=MAX_SPEED).contains(&speed)
}

/// A single synthesis request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    text: String,
    voice: String,
    speed: f32,
    language: String,
}

impl SynthesisRequest {
    /// Build a validated request.
    ///
    /// # Errors
    /// Returns `InvalidRequest` if the text is blank or the speed is out of range.
    pub fn new(text: impl Into<String>, voice: impl Into<String>, speed: f32, language: impl Into<String>) -> TtsResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TtsError::invalid_request("text cannot be empty"));
        }
        if !speed_in_range(speed) {
            return Err(TtsError::invalid_request(format!("speed {} is out of range ({:.1}-{:.1})", speed, MIN_SPEED, MAX_SPEED)));
        }
        Ok(Self { text, voice: voice.into(), speed, language: language.into() })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Advisory language tag; the server ignores it beyond logging.
    pub fn language(&self) -> &str {
        &self.language
    }
}

/// One unit of generated waveform, as yielded by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Mono f32 samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate declared by the model for this chunk.
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

/// The concatenated waveform of one generation run.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Wall-clock time spent generating.
    pub generation_time: Duration,
}

impl SynthesisResult {
    pub fn num_frames(&self) -> usize {
        self.samples.len()
    }

    /// Audio duration in seconds (`frames / sample_rate`).
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Seconds of audio produced per second of generation; zero when generation took no time.
    pub fn realtime_factor(&self) -> f64 {
        let gen_secs = self.generation_time.as_secs_f64();
        if gen_secs > 0.0 { self.duration_secs() / gen_secs } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_text() {
        let err = SynthesisRequest::new("   ", "Vivian", 1.0, SERVER_LANGUAGE).unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)));
    }

    #[test]
    fn test_request_rejects_out_of_range_speed() {
        assert!(SynthesisRequest::new("你好", "Vivian", 2.5, SERVER_LANGUAGE).is_err());
        assert!(SynthesisRequest::new("你好", "Vivian", 0.4, SERVER_LANGUAGE).is_err());
        assert!(SynthesisRequest::new("你好", "Vivian", 0.5, SERVER_LANGUAGE).is_ok());
        assert!(SynthesisRequest::new("你好", "Vivian", 2.0, SERVER_LANGUAGE).is_ok());
    }

    #[test]
    fn test_result_metrics() {
        let result = SynthesisResult { samples: vec![0.0; 48000], sample_rate: 24000, generation_time: Duration::from_millis(500) };
        assert_eq!(result.duration_secs(), 2.0);
        assert_eq!(result.realtime_factor(), 4.0);
    }

    #[test]
    fn test_realtime_factor_zero_generation_time() {
        let result = SynthesisResult { samples: vec![0.0; 24000], sample_rate: 24000, generation_time: Duration::ZERO };
        assert_eq!(result.realtime_factor(), 0.0);
    }
}
