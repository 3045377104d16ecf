//! WAV encoding for synthesized audio.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::{TtsError, TtsResult};

/// MIME type of the encoded container.
pub const WAV_MIME: &str = "audio/wav";

fn encode_err(e: hound::Error) -> TtsError {
    TtsError::Encode(e.to_string())
}

/// Convert a float sample in `[-1.0, 1.0]` to 16-bit PCM, clamping out-of-range values.
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode mono f32 samples as a 16-bit PCM WAV file in memory.
///
/// # Errors
/// Returns `Encode` if the sample rate is zero or the writer fails.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> TtsResult<Vec<u8>> {
    if sample_rate == 0 {
        return Err(TtsError::Encode("sample rate must be positive".to_string()));
    }

    let spec = WavSpec { channels: 1, sample_rate, bits_per_sample: 16, sample_format: SampleFormat::Int };

    let mut buffer = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut buffer, spec).map_err(encode_err)?;
        for &sample in samples {
            writer.write_sample(to_pcm16(sample)).map_err(encode_err)?;
        }
        writer.finalize().map_err(encode_err)?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use hound::WavReader;

    use super::*;

    #[test]
    fn test_encode_header_and_length() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect();
        let bytes = encode_wav(&samples, 24000).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let reader = WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 1000);
    }

    #[test]
    fn test_clipping() {
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-2.0), -i16::MAX);
        assert_eq!(to_pcm16(0.0), 0);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(matches!(encode_wav(&[0.1], 0), Err(TtsError::Encode(_))));
    }
}
