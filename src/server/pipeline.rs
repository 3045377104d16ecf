//! Synthesis pipeline: run the model, assemble its chunks, encode and persist the WAV.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::host::ModelHost;
use super::scratch::ScratchDir;
use crate::audio::encode_wav;
use crate::error::{TtsError, TtsResult};
use crate::types::{AudioChunk, SynthesisRequest, SynthesisResult};

/// Concatenate model chunks in generation order.
///
/// The cancel token is checked before each chunk is pulled, so a vanished caller stops the
/// model at the next chunk boundary. If chunks disagree on sample rate the last one wins.
///
/// # Returns
/// The samples and the sample rate they are played at.
///
/// # Errors
/// * `Cancelled` if the token fires mid-stream
/// * `NoAudioProduced` if nothing (or only empty chunks) came out
/// * Any error a chunk carries
pub fn assemble_chunks<I>(chunks: I, cancel: &CancellationToken) -> TtsResult<(Vec<f32>, u32)>
where
    I: IntoIterator<Item = TtsResult<AudioChunk>>,
{
    let mut chunks = chunks.into_iter();
    let mut samples = Vec::new();
    let mut sample_rate: Option<u32> = None;
    let mut count = 0usize;

    loop {
        if cancel.is_cancelled() {
            debug!("Generation abandoned after {} chunk(s)", count);
            return Err(TtsError::Cancelled);
        }

        let Some(chunk) = chunks.next() else { break };
        let chunk = chunk?;

        if let Some(previous) = sample_rate.filter(|&rate| rate != chunk.sample_rate) {
            warn!("Chunk {} declares {} Hz after {} Hz; using the latest rate", count, chunk.sample_rate, previous);
        }

        sample_rate = Some(chunk.sample_rate);
        samples.extend_from_slice(&chunk.samples);
        count += 1;
    }

    let sample_rate = sample_rate.ok_or(TtsError::NoAudioProduced)?;
    if samples.is_empty() {
        return Err(TtsError::NoAudioProduced);
    }
    if sample_rate == 0 {
        return Err(TtsError::generation("model declared a sample rate of zero"));
    }

    debug!("Assembled {} chunk(s), {} frames at {} Hz", count, samples.len(), sample_rate);
    Ok((samples, sample_rate))
}

/// A finished synthesis ready to be returned to the caller.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Encoded WAV bytes.
    pub wav: Vec<u8>,
    /// Scratch file holding the same bytes.
    pub path: PathBuf,
    pub sample_rate: u32,
    pub num_frames: usize,
    pub generation_time: Duration,
    pub duration_secs: f64,
    pub realtime_factor: f64,
}

impl SynthesisOutput {
    fn new(result: &SynthesisResult, wav: Vec<u8>, path: PathBuf) -> Self {
        Self {
            wav,
            path,
            sample_rate: result.sample_rate,
            num_frames: result.num_frames(),
            generation_time: result.generation_time,
            duration_secs: result.duration_secs(),
            realtime_factor: result.realtime_factor(),
        }
    }
}

/// Runs requests against the hosted model.
pub struct Synthesizer {
    host: Arc<ModelHost>,
    scratch: Arc<ScratchDir>,
}

impl Synthesizer {
    pub fn new(host: Arc<ModelHost>, scratch: Arc<ScratchDir>) -> Self {
        Self { host, scratch }
    }

    pub fn host(&self) -> &Arc<ModelHost> {
        &self.host
    }

    /// Synthesize one request.
    ///
    /// Generation runs on the blocking pool behind the model gate, so concurrent requests
    /// queue for the model without stalling the async runtime.
    ///
    /// # Arguments
    /// * `request` - Validated request
    /// * `cancel` - Fires when the caller is gone
    ///
    /// # Errors
    /// `ModelNotReady` before any work if the model is not loaded; otherwise any generation,
    /// encoding or I/O failure. Errors never leave the model unusable.
    pub async fn synthesize(&self, request: SynthesisRequest, cancel: CancellationToken) -> TtsResult<SynthesisOutput> {
        let state = self.host.state();
        if !self.host.is_ready() {
            return Err(TtsError::ModelNotReady(state));
        }

        let host = Arc::clone(&self.host);
        let (result, wav) = tokio::task::spawn_blocking(move || {
            let result = host.with_model(|model| {
                let start = Instant::now();
                let chunks = model.generate(request.text(), request.voice(), request.speed())?;
                let (samples, sample_rate) = assemble_chunks(chunks, &cancel)?;
                Ok(SynthesisResult { samples, sample_rate, generation_time: start.elapsed() })
            })?;
            let wav = encode_wav(&result.samples, result.sample_rate)?;
            Ok::<_, TtsError>((result, wav))
        })
        .await
        .map_err(|e| TtsError::generation(format!("generation task failed: {}", e)))??;

        let path = self.scratch.persist(&wav).await?;
        Ok(SynthesisOutput::new(&result, wav, path))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::tts::{ChunkStream, MockModel, SpeechModel};
    use crate::types::SERVER_LANGUAGE;

    /// Model that replays a fixed list of chunks and counts its invocations.
    struct ScriptedModel {
        chunks: Vec<AudioChunk>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ScriptedModel {
        fn new(chunks: Vec<AudioChunk>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { chunks, calls: Arc::clone(&calls), fail: false }, calls)
        }
    }

    impl SpeechModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate<'a>(&'a mut self, _text: &str, _voice: &str, _speed: f32) -> TtsResult<ChunkStream<'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TtsError::generation("scripted failure"));
            }
            Ok(Box::new(self.chunks.clone().into_iter().map(Ok)))
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, "Vivian", 1.0, SERVER_LANGUAGE).unwrap()
    }

    fn unloaded() -> (Synthesizer, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Arc::new(ScratchDir::create(tmp.path()).unwrap());
        (Synthesizer::new(Arc::new(ModelHost::new()), scratch), tmp)
    }

    fn loaded(model: impl SpeechModel + 'static) -> (Synthesizer, tempfile::TempDir) {
        let (synth, tmp) = unloaded();
        synth.host().load(move || Ok(Box::new(model))).unwrap();
        (synth, tmp)
    }

    #[test]
    fn test_assemble_preserves_frames_and_order() {
        let chunks = vec![Ok(AudioChunk::new(vec![0.1; 300], 24000)), Ok(AudioChunk::new(vec![0.2; 500], 24000))];
        let (samples, rate) = assemble_chunks(chunks, &CancellationToken::new()).unwrap();

        assert_eq!(samples.len(), 800);
        assert_eq!(rate, 24000);
        assert_eq!(samples[299], 0.1);
        assert_eq!(samples[300], 0.2);
    }

    #[test]
    fn test_assemble_empty_stream() {
        let chunks: Vec<TtsResult<AudioChunk>> = Vec::new();
        assert!(matches!(assemble_chunks(chunks, &CancellationToken::new()), Err(TtsError::NoAudioProduced)));

        let chunks = vec![Ok(AudioChunk::new(Vec::new(), 24000))];
        assert!(matches!(assemble_chunks(chunks, &CancellationToken::new()), Err(TtsError::NoAudioProduced)));
    }

    #[test]
    fn test_assemble_last_sample_rate_wins() {
        let chunks = vec![Ok(AudioChunk::new(vec![0.0; 10], 24000)), Ok(AudioChunk::new(vec![0.0; 10], 16000))];
        let (samples, rate) = assemble_chunks(chunks, &CancellationToken::new()).unwrap();
        assert_eq!(samples.len(), 20);
        assert_eq!(rate, 16000);
    }

    #[test]
    fn test_assemble_propagates_chunk_error() {
        let chunks = vec![Ok(AudioChunk::new(vec![0.0; 10], 24000)), Err(TtsError::generation("boom"))];
        assert!(matches!(assemble_chunks(chunks, &CancellationToken::new()), Err(TtsError::Generation(_))));
    }

    #[test]
    fn test_assemble_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        let pulled = AtomicUsize::new(0);
        let chunks = (0..5).map(|i| {
            pulled.fetch_add(1, Ordering::SeqCst);
            if i == 1 {
                cancel.cancel();
            }
            Ok(AudioChunk::new(vec![0.0; 10], 24000))
        });

        assert!(matches!(assemble_chunks(chunks, &cancel), Err(TtsError::Cancelled)));
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_synthesize_with_mock_model() {
        let (synth, tmp) = loaded(MockModel::default());

        let output = synth.synthesize(request("你好，世界。"), CancellationToken::new()).await.unwrap();

        assert_eq!(output.sample_rate, 24000);
        assert!(output.num_frames > 0);
        assert!(output.duration_secs > 0.0);
        assert!(output.path.starts_with(tmp.path()));
        assert_eq!(std::fs::read(&output.path).unwrap(), output.wav);

        let reader = hound::WavReader::new(Cursor::new(output.wav)).unwrap();
        assert_eq!(reader.len() as usize, output.num_frames);
    }

    #[tokio::test]
    async fn test_not_ready_does_no_work() {
        let (synth, tmp) = unloaded();

        let result = synth.synthesize(request("你好"), CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::ModelNotReady(_))));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_frame_count_matches_chunks() {
        let (model, calls) = ScriptedModel::new(vec![AudioChunk::new(vec![0.1; 1200], 24000), AudioChunk::new(vec![-0.1; 2400], 24000)]);
        let (synth, _tmp) = loaded(model);

        let output = synth.synthesize(request("两句话。第二句。"), CancellationToken::new()).await.unwrap();

        assert_eq!(output.num_frames, 3600);
        assert_eq!(output.duration_secs, 0.15);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_chunks_is_no_audio_produced() {
        let (model, _calls) = ScriptedModel::new(Vec::new());
        let (synth, tmp) = loaded(model);

        let result = synth.synthesize(request("silence"), CancellationToken::new()).await;

        assert!(matches!(result, Err(TtsError::NoAudioProduced)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_model() {
        let (mut model, calls) = ScriptedModel::new(vec![AudioChunk::new(vec![0.0; 100], 24000)]);
        model.fail = true;
        let (synth, _tmp) = loaded(model);

        assert!(synth.synthesize(request("first"), CancellationToken::new()).await.is_err());
        assert!(synth.host().is_ready());

        // Still serviceable: the gate is free and the model is still there.
        assert!(synth.synthesize(request("second"), CancellationToken::new()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_distinct_files() {
        let (synth, _tmp) = loaded(MockModel::default());
        let synth = Arc::new(synth);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let synth = Arc::clone(&synth);
                tokio::spawn(async move { synth.synthesize(request(&format!("第{}句。", i)), CancellationToken::new()).await })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            paths.insert(handle.await.unwrap().unwrap().path);
        }
        assert_eq!(paths.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_generation() {
        let (synth, _tmp) = loaded(MockModel::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = synth.synthesize(request("你好。"), cancel).await;
        assert!(matches!(result, Err(TtsError::Cancelled)));
    }
}
