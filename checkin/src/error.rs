//! Error types for the check-in pipeline.

use thiserror::Error;
use voxgate_audio::AudioError;

/// Result type alias for check-in operations.
pub type Result<T> = std::result::Result<T, CheckinError>;

/// A check-in that could not reach a decision.
///
/// Refusals are not errors; see [`Outcome::Rejected`](crate::Outcome::Rejected).
#[derive(Error, Debug)]
pub enum CheckinError {
    /// The request carried no address.
    #[error("Missing address parameter")]
    MissingAddress,

    /// The uploaded audio could not be normalized.
    #[error("audio format error: {0}")]
    Format(String),

    /// The speech-to-text call failed.
    #[error("iat error {0}")]
    Transcription(String),

    /// The voiceprint engine refused our credentials.
    #[error("voiceprint authentication failed: {0}")]
    Auth(String),

    /// The engine answered with something we could not parse.
    #[error("voiceprint protocol error: {0}")]
    Protocol(String),

    /// The engine answered with a non-zero status code.
    #[error("voiceprint engine error {code}: {message}")]
    Engine { code: i32, message: String },

    /// The engine could not be reached or did not answer in time.
    #[error("voiceprint engine unavailable: {0}")]
    Unavailable(String),

    /// 1:1 search did not find the claimed feature, yet 1:N search ranked it
    /// first. The engine contradicted itself.
    #[error("can't go here, 1:1 not found, but 1:N found: {feature_id}")]
    Conflict { feature_id: String },
}

impl From<voxgate_xfyun::Error> for CheckinError {
    fn from(e: voxgate_xfyun::Error) -> Self {
        use voxgate_xfyun::Error as X;

        if e.is_auth_error() {
            return CheckinError::Auth(e.to_string());
        }
        if e.is_protocol_error() {
            return CheckinError::Protocol(e.to_string());
        }
        match e {
            X::Api { code, message, .. } => CheckinError::Engine { code, message },
            X::InvalidUrl(_) | X::Config(_) => CheckinError::Protocol(e.to_string()),
            other => CheckinError::Unavailable(other.to_string()),
        }
    }
}

impl From<AudioError> for CheckinError {
    fn from(e: AudioError) -> Self {
        CheckinError::Format(e.to_string())
    }
}
