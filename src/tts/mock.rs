//! Mock backend: a deterministic tone generator standing in for the neural model.
//!
//! Useful for running the server without model weights. Each sentence yields one chunk
//! whose length scales with the sentence and inversely with speed, so timing, chunk
//! assembly and encoding behave like the real thing.

use std::f32::consts::TAU;

use tracing::debug;

use super::model::{ChunkStream, SpeechModel};
use super::text::split_sentences;
use crate::error::TtsResult;
use crate::types::{AudioChunk, DEFAULT_SAMPLE_RATE};

/// Seconds of audio per character at speed 1.0.
const SECONDS_PER_CHAR: f32 = 0.08;

/// Shortest chunk in seconds.
const MIN_CHUNK_SECONDS: f32 = 0.1;

const AMPLITUDE: f32 = 0.3;

/// Fade length in samples at each chunk edge, avoiding clicks between chunks.
const FADE_SAMPLES: usize = 240;

/// Tone generator implementing [`SpeechModel`].
#[derive(Debug, Clone)]
pub struct MockModel {
    sample_rate: u32,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl MockModel {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Base pitch per speaker so different voices are audibly distinct.
    fn pitch(voice: &str) -> f32 {
        match voice {
            "Vivian" => 220.0,
            "Chelsie" => 262.0,
            "Ethan" => 147.0,
            _ => 196.0,
        }
    }
}

/// Render one sentence as a faded sine tone.
fn render_tone(sentence: &str, pitch: f32, speed: f32, sample_rate: u32) -> AudioChunk {
    let seconds = (sentence.chars().count() as f32 * SECONDS_PER_CHAR / speed).max(MIN_CHUNK_SECONDS);
    let len = (seconds * sample_rate as f32) as usize;
    let fade = FADE_SAMPLES.min(len / 2).max(1);

    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let edge = i.min(len - 1 - i);
            let gain = if edge < fade { edge as f32 / fade as f32 } else { 1.0 };
            (TAU * pitch * t).sin() * AMPLITUDE * gain
        })
        .collect();

    AudioChunk::new(samples, sample_rate)
}

impl SpeechModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate<'a>(&'a mut self, text: &str, voice: &str, speed: f32) -> TtsResult<ChunkStream<'a>> {
        let sentences = split_sentences(text);
        let pitch = Self::pitch(voice);
        let sample_rate = self.sample_rate;

        debug!("Mock generation: {} sentence(s), voice {} at {} Hz", sentences.len(), voice, pitch);

        Ok(Box::new(sentences.into_iter().map(move |sentence| Ok(render_tone(&sentence, pitch, speed, sample_rate)))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_chunk_per_sentence() {
        let mut model = MockModel::default();
        let chunks: Vec<_> = model.generate("你好。再见。", "Vivian", 1.0).unwrap().collect::<TtsResult<_>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.sample_rate == 24000 && !c.samples.is_empty()));
    }

    #[test]
    fn test_faster_speed_is_shorter() {
        let mut model = MockModel::default();
        let slow: usize = model.generate("A fairly long sentence for timing.", "Ethan", 0.5).unwrap().map(|c| c.unwrap().num_samples()).sum();
        let fast: usize = model.generate("A fairly long sentence for timing.", "Ethan", 2.0).unwrap().map(|c| c.unwrap().num_samples()).sum();
        assert!(fast < slow);
    }

    #[test]
    fn test_samples_within_range() {
        let chunk = render_tone("x", 220.0, 1.0, 24000);
        assert_eq!(chunk.num_samples(), 2400);
        assert!(chunk.samples.iter().all(|s| s.abs() <= AMPLITUDE));
        assert_eq!(chunk.samples[0], 0.0);
    }

    #[test]
    fn test_blank_text_yields_no_chunks() {
        let mut model = MockModel::default();
        assert_eq!(model.generate("   ", "Vivian", 1.0).unwrap().count(), 0);
    }
}
