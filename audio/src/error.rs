//! Error types for audio normalization.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;

/// Error type for audio normalization.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The input is not a WAV stream we can decode.
    #[error("unsupported audio: {0}")]
    Format(String),

    /// Sample rate conversion failed.
    #[error("resample failed: {0}")]
    Resample(String),

    /// The MP3 encoder process failed or produced nothing.
    #[error("mp3 encoder failed: {0}")]
    Encoder(String),

    /// I/O error talking to the encoder process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder process did not finish in time.
    #[error("mp3 encoder timed out after {0:?}")]
    Timeout(Duration),
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        // The reader works on an in-memory buffer, so even hound's IoError
        // means truncated input.
        AudioError::Format(e.to_string())
    }
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}
