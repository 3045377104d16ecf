//! Kokoro backend using sherpa-rs (CUDA on Linux, CoreML on Apple Silicon).

use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{CommonTtsConfig, KokoroTts, KokoroTtsConfig};
use tracing::{debug, info, warn};

use super::model::{ChunkStream, SpeechModel};
use super::text::split_sentences;
use crate::config::ServerConfig;
use crate::config::voices::DEFAULT_VOICE;
use crate::error::{TtsError, TtsResult};
use crate::types::AudioChunk;

/// Kokoro speaker ids backing each registered voice (kokoro-multi-lang v1.0).
const SPEAKER_IDS: &[(&str, i32)] = &[
    ("Chelsie", 2), // af_bella
    ("Ethan", 16),  // am_michael
    ("Vivian", 47), // zf_xiaoxiao
];

/// Look up the Kokoro speaker id for a voice, falling back to the default voice.
fn speaker_id(voice: &str) -> i32 {
    let lookup = |name: &str| SPEAKER_IDS.binary_search_by_key(&name, |(n, _)| n).ok().map(|idx| SPEAKER_IDS[idx].1);

    lookup(voice).unwrap_or_else(|| {
        warn!("Unknown voice '{}', using {}", voice, DEFAULT_VOICE);
        lookup(DEFAULT_VOICE).unwrap_or(0)
    })
}

/// Kokoro text-to-speech model.
pub struct KokoroModel {
    tts: KokoroTts, // Kokoro TTS engine
}

impl KokoroModel {
    /// Load the Kokoro model.
    ///
    /// # Arguments
    /// * `config` - Server configuration
    ///
    /// # Errors
    /// Returns `ModelLoad` if required model files are missing.
    pub fn new(config: &ServerConfig) -> TtsResult<Self> {
        let provider = config.effective_provider();

        info!("Initializing Kokoro TTS model with {} provider", provider);

        for path in [config.tts_model_path(), config.tts_voices_path(), config.tts_tokens_path()] {
            if !path.exists() {
                return Err(TtsError::ModelLoad(format!("required model file not found: {}", path.display())));
            }
        }

        let tts_config = KokoroTtsConfig {
            model: config.tts_model_path().to_string_lossy().to_string(),
            voices: config.tts_voices_path().to_string_lossy().to_string(),
            tokens: config.tts_tokens_path().to_string_lossy().to_string(),
            data_dir: config.tts_data_dir().to_string_lossy().to_string(),
            dict_dir: config.tts_dict_dir().to_string_lossy().to_string(),
            lexicon: config.tts_lexicon(),
            lang: String::new(), // Chinese and English use lexicon files
            length_scale: 1.0,   // Speed is applied per request
            onnx_config: OnnxConfig {
                provider: provider.as_sherpa_provider().to_string(),
                num_threads: config.tts_threads.try_into().unwrap_or(1),
                debug: config.verbose,
            },
            common_config: CommonTtsConfig { max_num_sentences: 1, ..Default::default() }, // Kokoro only supports 1
        };

        let tts = KokoroTts::new(tts_config);

        Ok(Self { tts })
    }
}

impl SpeechModel for KokoroModel {
    fn name(&self) -> &str {
        "kokoro"
    }

    fn generate<'a>(&'a mut self, text: &str, voice: &str, speed: f32) -> TtsResult<ChunkStream<'a>> {
        let sid = speaker_id(voice);
        let sentences = split_sentences(text);
        let tts = &mut self.tts;

        debug!("Kokoro generation: {} sentence(s), speaker id {}", sentences.len(), sid);

        Ok(Box::new(sentences.into_iter().map(move |sentence| {
            let audio = tts.create(&sentence, sid, speed).map_err(|e| TtsError::generation(format!("Kokoro failed on \"{}\": {}", sentence, e)))?;
            Ok(AudioChunk::new(audio.samples, audio.sample_rate as u32))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speaker_ids_sorted() {
        assert!(SPEAKER_IDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_unknown_voice_uses_default() {
        assert_eq!(speaker_id("Ethan"), 16);
        assert_eq!(speaker_id("Nobody"), speaker_id(DEFAULT_VOICE));
    }
}
