//! WAV → (16 kHz mono PCM, MP3).

use std::sync::Arc;

use tracing::debug;

use crate::error::{AudioError, Result};
use crate::format::Format;
use crate::mp3::{CommandEncoder, Mp3Encoder};
use crate::resample::resample_mono;
use crate::wav::{decode_mono, to_pcm16le};

/// Both renditions of one uploaded sample.
#[derive(Debug, Clone, Default)]
pub struct NormalizedAudio {
    /// 16 kHz, 16-bit little-endian, mono PCM for dictation.
    pub pcm: Vec<u8>,
    /// Mono 16 kHz MP3 for the voiceprint engine.
    pub mp3: Vec<u8>,
}

/// Converts a WAV file to 16 kHz mono 16-bit PCM.
pub fn wav_to_pcm16k(wav: &[u8]) -> Result<Vec<u8>> {
    let decoded = decode_mono(wav)?;
    let target = Format::MONO_16K.sample_rate;
    let samples = resample_mono(&decoded.samples, decoded.source.sample_rate, target)?;
    debug!(
        sample_rate = decoded.source.sample_rate,
        channels = decoded.source.channels,
        bits = decoded.bits_per_sample,
        frames = decoded.samples.len(),
        out_frames = samples.len(),
        "wav normalized"
    );
    Ok(to_pcm16le(&samples))
}

/// Produces the PCM and MP3 renditions of uploaded WAV audio.
///
/// The two are derived independently from the original bytes.
#[derive(Clone)]
pub struct AudioNormalizer {
    encoder: Arc<dyn Mp3Encoder>,
}

impl AudioNormalizer {
    /// Creates a normalizer with the given MP3 encoder.
    pub fn new(encoder: Arc<dyn Mp3Encoder>) -> Self {
        Self { encoder }
    }

    /// Normalizes one WAV upload.
    pub async fn normalize(&self, wav: &[u8]) -> Result<NormalizedAudio> {
        let input = wav.to_vec();
        let pcm = async move {
            tokio::task::spawn_blocking(move || wav_to_pcm16k(&input))
                .await
                .map_err(|e| AudioError::Resample(format!("resample task: {}", e)))?
        };
        let (pcm, mp3) = tokio::try_join!(pcm, self.encoder.encode(wav))?;
        Ok(NormalizedAudio { pcm, mp3 })
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(CommandEncoder::default()))
    }
}
