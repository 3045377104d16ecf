//! The inference capability the server drives.

use crate::error::TtsResult;
use crate::types::AudioChunk;

/// Finite, non-restartable sequence of generated chunks.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = TtsResult<AudioChunk>> + 'a>;

/// A loaded text-to-speech model.
///
/// Generation takes `&mut self`: backends are not assumed reentrant, so the server keeps the
/// model behind a gate and runs one generation at a time.
pub trait SpeechModel: Send {
    /// Short backend name for logs and `/health`.
    fn name(&self) -> &str;

    /// Start generating speech for `text`.
    ///
    /// The returned stream is lazy: chunks are produced as the caller pulls them, and the
    /// model stays borrowed until the stream is dropped.
    ///
    /// # Arguments
    /// * `text` - Text to speak
    /// * `voice` - Speaker name; unknown names are the backend's call
    /// * `speed` - Speech speed multiplier
    fn generate<'a>(&'a mut self, text: &str, voice: &str, speed: f32) -> TtsResult<ChunkStream<'a>>;
}
