//! Error types for the iFlytek open platform client.

use thiserror::Error;

/// Engine status codes carried in `header.code` of a response envelope.
pub mod status_code {
    /// Success.
    pub const SUCCESS: i32 = 0;

    /// `searchScoreFea` (1:1): the requested `dstFeatureId` has no enrolled
    /// feature in the group. The caller has simply not been enrolled yet.
    pub const FEATURE_NOT_FOUND: i32 = 23007;

    /// `searchFea` (1:N): the group holds no features that could be ranked
    /// against the sample. An empty group answers with this code rather than
    /// with an empty `scoreList`.
    pub const NO_CANDIDATES: i32 = 23008;
}

/// Result type alias for iFlytek operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for iFlytek API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-zero engine code in the response envelope, or a non-2xx reply
    /// that was not an authentication failure.
    #[error("xfyun: {message} (code={code}, sid={sid})")]
    Api {
        code: i32,
        message: String,
        sid: String,
        http_status: u16,
    },

    /// The gateway refused the signed request. The signature is checked
    /// remotely, so nothing more specific is known locally.
    #[error("xfyun: authentication rejected (http {http_status}): {message}")]
    Auth { http_status: u16, message: String },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The endpoint URL could not be split into host and path.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// The response envelope did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A bounded call ran out of time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a new API error.
    pub fn api(code: i32, message: impl Into<String>, http_status: u16) -> Self {
        Error::Api {
            code,
            message: message.into(),
            sid: String::new(),
            http_status,
        }
    }

    /// Creates a new API error with the session id reported by the engine.
    pub fn api_with_sid(
        code: i32,
        message: impl Into<String>,
        sid: impl Into<String>,
        http_status: u16,
    ) -> Self {
        Error::Api {
            code,
            message: message.into(),
            sid: sid.into(),
            http_status,
        }
    }

    /// Returns the engine code if this is an API error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if the 1:1 search reported that the feature is not enrolled.
    pub fn is_feature_not_found(&self) -> bool {
        self.code() == Some(status_code::FEATURE_NOT_FOUND)
    }

    /// Returns true if the 1:N search reported that the group has no candidates.
    pub fn is_no_candidates(&self) -> bool {
        self.code() == Some(status_code::NO_CANDIDATES)
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Auth { .. } => true,
            Error::Api { http_status, .. } => *http_status == 401 || *http_status == 403,
            _ => false,
        }
    }

    /// Returns true if the envelope or its payload could not be understood.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::Json(_) | Error::Base64Decode(_)
        )
    }
}
