//! Text-to-speech backends.
//!
//! The server sees only [`SpeechModel`]: text, voice and speed in, a lazy stream of audio
//! chunks out. Kokoro (sherpa-rs) is available with the `kokoro` feature.

#[cfg(feature = "kokoro")]
mod kokoro;
mod mock;
mod model;
mod text;

#[cfg(feature = "kokoro")]
pub use kokoro::KokoroModel;
pub use mock::MockModel;
pub use model::{ChunkStream, SpeechModel};
pub use text::split_sentences;

use crate::config::{Backend, ServerConfig};
use crate::error::TtsResult;

/// Construct the backend selected in the configuration. Blocking; may take seconds.
pub fn load_backend(config: &ServerConfig) -> TtsResult<Box<dyn SpeechModel>> {
    match config.backend {
        Backend::Mock => Ok(Box::new(MockModel::default())),
        #[cfg(feature = "kokoro")]
        Backend::Kokoro => Ok(Box::new(KokoroModel::new(config)?)),
        #[cfg(not(feature = "kokoro"))]
        Backend::Kokoro => Err(crate::error::TtsError::ModelLoad("built without the `kokoro` feature".to_string())),
    }
}
