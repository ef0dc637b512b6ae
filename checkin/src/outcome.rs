//! Business outcomes of a check-in and the report recorded for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CheckinError;

/// Report code: a new voiceprint was enrolled.
pub const RESULT_ENROLLED: i32 = 0;
/// Report code: the caller was recognized.
pub const RESULT_CONFIRMED: i32 = 1;
/// Report code: rejected, or the check-in failed.
pub const RESULT_FAILED: i32 = 2;
/// Report code: nothing recorded for the address.
pub const RESULT_UNKNOWN: i32 = -1;

/// Outcome of a check-in that ran to a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The sample matches the caller's enrolled voiceprint.
    Confirmed { feature_id: String, score: f64 },
    /// The check-in was refused.
    Rejected(Rejection),
    /// The sample was enrolled as a new voiceprint.
    Enrolled { feature_id: String },
}

/// Why a check-in was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The claimed voiceprint exists but the sample does not score above the
    /// threshold.
    ScoreTooLow { feature_id: String, score: f64 },
    /// The sample belongs to another enrolled identity.
    BelongsToOther {
        claimed: String,
        other: String,
        score: f64,
    },
    /// The spoken content does not contain the expected phrase.
    ContentMismatch { transcript: String, expected: String },
}

impl Rejection {
    /// Short reason stored in the report.
    pub fn reason(&self) -> String {
        match self {
            Rejection::ScoreTooLow { feature_id, .. } => format!("you are not {}", feature_id),
            Rejection::BelongsToOther { claimed, other, .. } => {
                format!("you are {} not {}", other, claimed)
            }
            Rejection::ContentMismatch { .. } => self.to_string(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ScoreTooLow { feature_id, .. } => {
                write!(f, "no, you are not {}", feature_id)
            }
            Rejection::BelongsToOther { claimed, other, .. } => {
                write!(f, "oh, you are {} not {}", other, claimed)
            }
            Rejection::ContentMismatch {
                transcript,
                expected,
            } => write!(f, "iat result is {} not match {}", transcript, expected),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Confirmed { feature_id, .. } => write!(f, "yes, you are {}", feature_id),
            Outcome::Rejected(r) => r.fmt(f),
            Outcome::Enrolled { feature_id } => {
                write!(f, "create new feature for you: {}", feature_id)
            }
        }
    }
}

impl Outcome {
    /// Report code for this outcome.
    pub fn result_code(&self) -> i32 {
        match self {
            Outcome::Enrolled { .. } => RESULT_ENROLLED,
            Outcome::Confirmed { .. } => RESULT_CONFIRMED,
            Outcome::Rejected(_) => RESULT_FAILED,
        }
    }
}

/// What `/upload/result` returns for an address.
///
/// Field names on the wire follow the existing web client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinReport {
    /// Caller-supplied upload id.
    #[serde(rename = "ID", default)]
    pub id: String,
    /// One of the `RESULT_*` codes.
    #[serde(rename = "Result")]
    pub result: i32,
    /// Rejection reason or error text; empty on success.
    #[serde(rename = "Error", default)]
    pub error: String,
    /// Unix seconds when the check-in finished.
    #[serde(rename = "Timestamp", default)]
    pub timestamp: i64,
    /// Feature id the check-in ran against.
    #[serde(rename = "FeatureId", default, skip_serializing_if = "String::is_empty")]
    pub feature_id: String,
}

impl CheckinReport {
    /// Builds the report for a finished check-in.
    pub fn from_result(
        id: &str,
        feature_id: &str,
        result: &Result<Outcome, CheckinError>,
        timestamp: i64,
    ) -> Self {
        let (code, error) = match result {
            Ok(Outcome::Rejected(r)) => (RESULT_FAILED, r.reason()),
            Ok(outcome) => (outcome.result_code(), String::new()),
            Err(e) => (RESULT_FAILED, e.to_string()),
        };
        Self {
            id: id.to_string(),
            result: code,
            error,
            timestamp,
            feature_id: feature_id.to_string(),
        }
    }

    /// Placeholder for an address with nothing recorded.
    pub fn unknown(address: &str) -> Self {
        Self {
            id: String::new(),
            result: RESULT_UNKNOWN,
            error: format!("sorry, no result for the address:{}", address),
            timestamp: 0,
            feature_id: String::new(),
        }
    }
}
