//! Audio normalization for voice check-in.
//!
//! Uploaded WAV audio is turned into the two renditions the remote engines
//! take:
//!
//! - `pcm`: 16 kHz, 16-bit, mono little-endian PCM (dictation)
//! - `mp3`: mono 16 kHz MP3 (voiceprint)
//!
//! # Example
//!
//! ```rust,no_run
//! use voxgate_audio::AudioNormalizer;
//!
//! # async fn run(wav: Vec<u8>) -> voxgate_audio::Result<()> {
//! let normalizer = AudioNormalizer::default();
//! let audio = normalizer.normalize(&wav).await?;
//! println!("pcm {} bytes, mp3 {} bytes", audio.pcm.len(), audio.mp3.len());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod format;
pub mod mp3;
mod normalize;
pub mod resample;
pub mod wav;

pub use error::{AudioError, Result};
pub use format::{is_supported_rate, Format, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use mp3::{CommandEncoder, Mp3Encoder, DEFAULT_ENCODER_PROGRAM, DEFAULT_ENCODER_TIMEOUT};
pub use normalize::{wav_to_pcm16k, AudioNormalizer, NormalizedAudio};
