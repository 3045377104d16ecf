//! Error taxonomy shared by the synthesis server and the relay client.
//!
//! Every failure is classified once, where it happens, and keeps its kind all the way to
//! the log line. The relay collapses them into a `None` for its caller, but never before
//! logging which kind it was.

use std::time::Duration;

use crate::server::ModelState;

/// Errors produced while relaying, generating or encoding speech.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// The server could not be reached at all (DNS failure, connection refused or reset).
    #[error("cannot reach TTS server: {0}")]
    Connectivity(String),

    /// The request deadline elapsed before a response was received.
    #[error("timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("server returned status {status}: {body}")]
    Server { status: u16, body: String },

    /// The server answered successfully but the body could not be parsed.
    #[error("malformed response from TTS server: {0}")]
    MalformedResponse(String),

    /// The server answered successfully but the body was empty.
    #[error("received empty audio data from TTS server")]
    EmptyAudio,

    /// The model finished generating without yielding any audio.
    #[error("no audio produced")]
    NoAudioProduced,

    /// A request arrived before the model reached the ready state.
    #[error("model not ready (state: {0})")]
    ModelNotReady(ModelState),

    /// The model could not be loaded at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The model failed while generating a chunk.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Request parameters were rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller went away and generation was abandoned.
    #[error("generation cancelled")]
    Cancelled,

    /// WAV encoding failed.
    #[error("audio encoding failed: {0}")]
    Encode(String),

    /// The health endpoint reported the server as not serving.
    #[error("server unhealthy (status: {0})")]
    Unhealthy(String),

    /// I/O error (scratch files, output files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Stable label used in log fields so collapsed failures stay distinguishable.
    pub fn kind(&self) -> &'static str {
        match self {
            TtsError::Connectivity(_) => "transport",
            TtsError::Timeout(_) => "timeout",
            TtsError::Server { .. } => "server",
            TtsError::MalformedResponse(_) => "malformed_response",
            TtsError::EmptyAudio => "empty_audio",
            TtsError::NoAudioProduced => "no_audio_produced",
            TtsError::ModelNotReady(_) => "model_not_ready",
            TtsError::ModelLoad(_) => "model_load",
            TtsError::Generation(_) => "generation",
            TtsError::InvalidRequest(_) => "invalid_request",
            TtsError::Cancelled => "cancelled",
            TtsError::Encode(_) => "encode",
            TtsError::Unhealthy(_) => "unhealthy",
            TtsError::Io(_) => "io",
        }
    }

    /// Create a generation error with message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create an invalid request error with message.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Map a reqwest failure onto the transport side of the taxonomy.
    pub fn from_transport(err: reqwest::Error, deadline: Duration) -> Self {
        if err.is_timeout() { TtsError::Timeout(deadline) } else { TtsError::Connectivity(err.to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TtsError::Server { status: 500, body: "Model not loaded".to_string() };
        assert_eq!(err.to_string(), "server returned status 500: Model not loaded");

        let err = TtsError::Timeout(Duration::from_millis(60_200));
        assert_eq!(err.to_string(), "timed out after 60.2s");

        let err = TtsError::ModelNotReady(ModelState::Loading);
        assert_eq!(err.to_string(), "model not ready (state: loading)");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            TtsError::Connectivity("refused".into()),
            TtsError::Timeout(Duration::from_secs(1)),
            TtsError::Server { status: 500, body: String::new() },
            TtsError::MalformedResponse("not json".into()),
            TtsError::EmptyAudio,
            TtsError::NoAudioProduced,
            TtsError::ModelNotReady(ModelState::Unloaded),
        ];
        let mut kinds: Vec<_> = errors.iter().map(TtsError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
