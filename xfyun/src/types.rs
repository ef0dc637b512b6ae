//! Wire types for the voiceprint (s782b4996) envelope.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Service function identifier of the voiceprint capability.
pub const SERVICE_ID: &str = "s782b4996";

/// `header.status` / `payload.resource.status` value for a one-shot request.
pub const STATUS_ONE_SHOT: i32 = 3;

/// Audio encoding tag for MP3 audio in `payload.resource`.
pub const AUDIO_ENCODING_LAME: &str = "lame";

/// Sample rate declared in `payload.resource`.
pub const AUDIO_SAMPLE_RATE: u32 = 16000;

// ================== Request ==================

/// Full request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    pub header: RequestHeader,
    pub parameter: RequestParameter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RequestPayload>,
}

/// `header` section.
#[derive(Debug, Clone, Serialize)]
pub struct RequestHeader {
    pub app_id: String,
    pub status: i32,
}

/// `parameter` section, keyed by the service id.
#[derive(Debug, Clone, Serialize)]
pub struct RequestParameter {
    #[serde(rename = "s782b4996")]
    pub service: ServiceParameter,
}

/// Operation-specific parameters.
///
/// Exactly one `{func}Res` entry is flattened into the object; it tells the
/// engine how to encode the result payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceParameter {
    pub func: String,
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "groupName", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(rename = "groupInfo", skip_serializing_if = "Option::is_none")]
    pub group_info: Option<String>,
    #[serde(rename = "featureId", skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(rename = "dstFeatureId", skip_serializing_if = "Option::is_none")]
    pub dst_feature_id: Option<String>,
    #[serde(rename = "featureInfo", skip_serializing_if = "Option::is_none")]
    pub feature_info: Option<String>,
    #[serde(rename = "topK", skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(flatten)]
    pub result: BTreeMap<String, ResultFormat>,
}

/// Requested encoding of the result payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultFormat {
    pub encoding: String,
    pub compress: String,
    pub format: String,
}

impl Default for ResultFormat {
    fn default() -> Self {
        Self {
            encoding: "utf8".to_string(),
            compress: "raw".to_string(),
            format: "json".to_string(),
        }
    }
}

/// `payload` section for operations that carry audio.
#[derive(Debug, Clone, Serialize)]
pub struct RequestPayload {
    pub resource: AudioResource,
}

/// Audio metadata and base64 MP3 data.
#[derive(Debug, Clone, Serialize)]
pub struct AudioResource {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_depth: u32,
    pub status: i32,
    pub audio: String,
}

impl AudioResource {
    /// Wraps already base64-encoded MP3 audio with the fixed metadata.
    pub fn lame(audio_base64: String) -> Self {
        Self {
            encoding: AUDIO_ENCODING_LAME.to_string(),
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: 1,
            bit_depth: 16,
            status: STATUS_ONE_SHOT,
            audio: audio_base64,
        }
    }
}

// ================== Response ==================

/// Full response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub header: ResponseHeader,
    #[serde(default)]
    pub payload: Option<HashMap<String, ResultText>>,
}

/// `header` section of a response.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseHeader {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
}

/// One `payload.{func}Res` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultText {
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub compress: String,
    #[serde(default)]
    pub format: String,
    pub text: String,
}

// ================== Decoded results ==================

/// A scored feature returned by `searchScoreFea` or inside `searchFea`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    #[serde(rename = "featureId", default)]
    pub feature_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(rename = "featureInfo", default)]
    pub feature_info: String,
}

/// Decoded `searchFea` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreList {
    #[serde(rename = "scoreList", default)]
    pub score_list: Vec<FeatureScore>,
}

/// An enrolled feature listed by `queryFeatureList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEntry {
    #[serde(rename = "featureId", default)]
    pub feature_id: String,
    #[serde(rename = "featureInfo", default)]
    pub feature_info: String,
}

/// Decoded `createGroup` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    #[serde(rename = "groupId", default)]
    pub group_id: String,
    #[serde(rename = "groupName", default)]
    pub group_name: String,
    #[serde(rename = "groupInfo", default)]
    pub group_info: String,
}

/// Decoded `createFeature` result.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CreatedFeature {
    #[serde(rename = "featureId", default)]
    pub feature_id: String,
}

// ================== Dictation ==================

/// Dictation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    /// Mandarin Chinese
    #[default]
    #[serde(rename = "zh_cn")]
    ZhCn,
    /// English
    #[serde(rename = "en_us")]
    EnUs,
}

impl Language {
    /// Returns the language tag sent to the dictation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::ZhCn => "zh_cn",
            Language::EnUs => "en_us",
        }
    }
}
