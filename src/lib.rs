//! Qwen3 TTS - a speech synthesis server and the relay client that calls it.
//!
//! The server hosts one text-to-speech model, turns requests into WAV audio and serves it
//! over HTTP. The relay forwards text to that server under a deadline sized to the text,
//! and reduces every outcome to audio or a logged, classified failure.

pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod relay;
pub mod server;
pub mod tts;
pub mod types;

pub use error::{TtsError, TtsResult};
