//! WAV decoding to mono float samples.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};

use crate::error::{AudioError, Result};
use crate::format::{is_supported_rate, Format, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};

/// Mono samples in `[-1.0, 1.0]` plus the format they came from.
#[derive(Debug, Clone)]
pub struct MonoSamples {
    /// Format of the source stream.
    pub source: Format,
    /// Bits per sample of the source stream.
    pub bits_per_sample: u16,
    /// Channel-averaged samples.
    pub samples: Vec<f32>,
}

/// Decodes a WAV byte stream and averages its channels to mono.
///
/// Integer samples of 8 to 32 bits and 32-bit float samples are accepted,
/// at sample rates within [`MIN_SAMPLE_RATE`]`..=`[`MAX_SAMPLE_RATE`].
/// A trailing partial frame is dropped.
pub fn decode_mono(wav: &[u8]) -> Result<MonoSamples> {
    if wav.is_empty() {
        return Err(AudioError::Format("empty input".to_string()));
    }

    let reader = WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::Format("zero channels".to_string()));
    }
    if !is_supported_rate(spec.sample_rate) {
        return Err(AudioError::Format(format!(
            "sample rate {} Hz outside {}..={} Hz",
            spec.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
        )));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = 1.0 / (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::Format(format!(
                "unsupported sample format {:?}/{} bits",
                format, bits
            )));
        }
    };

    let channels = spec.channels as usize;
    let samples: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    if samples.is_empty() {
        return Err(AudioError::Format("no samples".to_string()));
    }

    Ok(MonoSamples {
        source: Format {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        },
        bits_per_sample: spec.bits_per_sample,
        samples,
    })
}

/// Converts float samples to little-endian 16-bit PCM.
pub fn to_pcm16le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}


#[cfg(test)]
mod tests {
    use super::testutil::*;
    use super::*;
    use hound::{WavSpec, WavWriter};

    #[test]
    fn test_decode_mono_16bit_is_exact() {
        let samples: Vec<i16> = vec![0, 1, -1, 1000, -32768, 32767];
        let wav = wav_i16(16000, 1, &samples);
        let decoded = decode_mono(&wav).unwrap();
        assert_eq!(decoded.source, Format::MONO_16K);
        assert_eq!(decoded.bits_per_sample, 16);

        let pcm = to_pcm16le(&decoded.samples);
        let back: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(back, samples);
    }

    #[test]
    fn test_decode_averages_channels() {
        let wav = wav_i16(8000, 2, &[1000, 3000, -2000, 0]);
        let decoded = decode_mono(&wav).unwrap();
        assert_eq!(decoded.source.channels, 2);
        assert_eq!(
            to_pcm16le(&decoded.samples),
            to_pcm16le(&[2000.0 / 32768.0, -1000.0 / 32768.0])
        );
    }

    #[test]
    fn test_decode_float() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.write_sample(-0.25f32).unwrap();
        writer.finalize().unwrap();

        let decoded = decode_mono(&cursor.into_inner()).unwrap();
        assert_eq!(decoded.samples, vec![0.5, -0.25]);
    }

    #[test]
    fn test_rejects_garbage_and_empty() {
        assert!(matches!(decode_mono(b""), Err(AudioError::Format(_))));
        assert!(matches!(
            decode_mono(b"definitely not a riff header"),
            Err(AudioError::Format(_))
        ));
    }

    #[test]
    fn test_rejects_header_without_samples() {
        let wav = wav_i16(16000, 1, &[]);
        assert!(matches!(decode_mono(&wav), Err(AudioError::Format(_))));
    }

    #[test]
    fn test_rejects_out_of_range_sample_rate() {
        let wav = wav_i16(16000, 1, &[1, 2, 3, 4]);
        for rate in [1_000_000_007, 1_000_003, 192_001, 7_999] {
            let patched = with_header_rate(wav.clone(), rate);
            match decode_mono(&patched) {
                Err(AudioError::Format(msg)) => assert!(msg.contains("sample rate"), "{}", msg),
                other => panic!("rate {}: expected format error, got {:?}", rate, other),
            }
        }
    }

    #[test]
    fn test_accepts_rate_bounds() {
        let wav = wav_i16(16000, 1, &[1, 2, 3, 4]);
        for rate in [MIN_SAMPLE_RATE, MAX_SAMPLE_RATE] {
            let decoded = decode_mono(&with_header_rate(wav.clone(), rate)).unwrap();
            assert_eq!(decoded.source.sample_rate, rate);
            assert_eq!(decoded.samples.len(), 4);
        }
    }

    #[test]
    fn test_to_pcm16le_clamps() {
        let pcm = to_pcm16le(&[2.0, -2.0]);
        assert_eq!(pcm, [0xff, 0x7f, 0x00, 0x80]);
    }
}
