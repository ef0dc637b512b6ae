//! Voiceprint service (capability `s782b4996`).
//!
//! Manages groups of enrolled speaker features and scores audio against
//! them. Every operation is one signed POST of a JSON envelope:
//!
//! - `header`: app id and the one-shot status
//! - `parameter.s782b4996`: `func`, `groupId`, operation fields and the
//!   `{func}Res` result-format block
//! - `payload.resource`: MP3 audio metadata and base64 data (audio operations only)
//!
//! The reply carries `header.code`; on success the operation result is the
//! base64 JSON in `payload.{func}Res.text`.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    error::{status_code, Error, Result},
    http::HttpClient,
    types::{
        AudioResource, CreatedFeature, FeatureEntry, FeatureScore, GroupInfo, RequestEnvelope,
        RequestHeader, RequestParameter, RequestPayload, ResponseEnvelope, ResultFormat,
        ScoreList, ServiceParameter, STATUS_ONE_SHOT,
    },
};

/// Default voiceprint endpoint.
pub const DEFAULT_VOICEPRINT_URL: &str = "https://api.xf-yun.com/v1/private/s782b4996";

/// One voiceprint operation and its operation-specific inputs.
///
/// Audio is MP3 (16 kHz, mono) and is base64-encoded when the envelope is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<'a> {
    /// Creates a group.
    CreateGroup {
        group_name: &'a str,
        group_info: &'a str,
    },
    /// Deletes a group and every feature in it.
    DeleteGroup,
    /// Enrolls a new feature.
    CreateFeature {
        feature_id: &'a str,
        feature_info: &'a str,
        audio: &'a [u8],
    },
    /// Replaces the audio and info of an existing feature.
    UpdateFeature {
        feature_id: &'a str,
        feature_info: &'a str,
        audio: &'a [u8],
    },
    /// Deletes a feature.
    DeleteFeature { feature_id: &'a str },
    /// Lists the features of a group.
    QueryFeatureList,
    /// 1:N search across the group.
    SearchFea { top_k: u32, audio: &'a [u8] },
    /// 1:1 comparison against one feature.
    SearchScoreFea {
        dst_feature_id: &'a str,
        audio: &'a [u8],
    },
}

impl Operation<'_> {
    /// Returns the `func` name of the operation.
    pub fn func(&self) -> &'static str {
        match self {
            Operation::CreateGroup { .. } => "createGroup",
            Operation::DeleteGroup => "deleteGroup",
            Operation::CreateFeature { .. } => "createFeature",
            Operation::UpdateFeature { .. } => "updateFeature",
            Operation::DeleteFeature { .. } => "deleteFeature",
            Operation::QueryFeatureList => "queryFeatureList",
            Operation::SearchFea { .. } => "searchFea",
            Operation::SearchScoreFea { .. } => "searchScoreFea",
        }
    }

    /// Returns the key of the result block, in the request and in the reply.
    pub fn result_key(&self) -> String {
        format!("{}Res", self.func())
    }

    /// Returns the audio carried by the operation, if any.
    pub fn audio(&self) -> Option<&[u8]> {
        match self {
            Operation::CreateFeature { audio, .. }
            | Operation::UpdateFeature { audio, .. }
            | Operation::SearchFea { audio, .. }
            | Operation::SearchScoreFea { audio, .. } => Some(*audio),
            _ => None,
        }
    }
}

/// Builds the request envelope for `op` in `group_id`.
pub fn build_request(app_id: &str, group_id: &str, op: &Operation<'_>) -> RequestEnvelope {
    let mut service = ServiceParameter {
        func: op.func().to_string(),
        group_id: group_id.to_string(),
        group_name: None,
        group_info: None,
        feature_id: None,
        dst_feature_id: None,
        feature_info: None,
        top_k: None,
        result: BTreeMap::from([(op.result_key(), ResultFormat::default())]),
    };

    match op {
        Operation::CreateGroup {
            group_name,
            group_info,
        } => {
            service.group_name = Some(group_name.to_string());
            service.group_info = Some(group_info.to_string());
        }
        Operation::CreateFeature {
            feature_id,
            feature_info,
            ..
        }
        | Operation::UpdateFeature {
            feature_id,
            feature_info,
            ..
        } => {
            service.feature_id = Some(feature_id.to_string());
            service.feature_info = Some(feature_info.to_string());
        }
        Operation::DeleteFeature { feature_id } => {
            service.feature_id = Some(feature_id.to_string());
        }
        Operation::SearchFea { top_k, .. } => {
            service.top_k = Some(*top_k);
        }
        Operation::SearchScoreFea { dst_feature_id, .. } => {
            service.dst_feature_id = Some(dst_feature_id.to_string());
        }
        Operation::DeleteGroup | Operation::QueryFeatureList => {}
    }

    RequestEnvelope {
        header: RequestHeader {
            app_id: app_id.to_string(),
            status: STATUS_ONE_SHOT,
        },
        parameter: RequestParameter { service },
        payload: op.audio().map(|audio| RequestPayload {
            resource: AudioResource::lame(BASE64.encode(audio)),
        }),
    }
}

/// Parses a reply envelope and returns the decoded `payload.{result_key}.text`.
///
/// A non-zero `header.code` becomes [`Error::Api`] with the engine message.
pub fn decode_response(body: &[u8], result_key: &str) -> Result<Vec<u8>> {
    let envelope: ResponseEnvelope = serde_json::from_slice(body)
        .map_err(|e| Error::Protocol(format!("response envelope: {}", e)))?;

    let header = envelope.header;
    if header.code != status_code::SUCCESS {
        return Err(Error::api_with_sid(header.code, header.message, header.sid, 200));
    }

    let text = envelope
        .payload
        .as_ref()
        .and_then(|p| p.get(result_key))
        .map(|r| r.text.as_str())
        .ok_or_else(|| Error::Protocol(format!("missing payload.{}.text", result_key)))?;

    Ok(BASE64.decode(text)?)
}

/// Voiceprint service.
pub struct VoiceprintService {
    http: Arc<HttpClient>,
}

impl VoiceprintService {
    /// Creates a new voiceprint service.
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Runs one operation and returns its decoded result payload.
    pub async fn execute(&self, group_id: &str, op: &Operation<'_>) -> Result<Vec<u8>> {
        let func = op.func();
        let envelope = build_request(self.http.app_id(), group_id, op);
        debug!(func, group_id, "xfyun voiceprint request");

        let body = self
            .http
            .post_signed(self.http.voiceprint_url(), &envelope)
            .await?;

        match decode_response(&body, &op.result_key()) {
            Ok(text) => {
                debug!(func, result = %String::from_utf8_lossy(&text), "xfyun voiceprint result");
                Ok(text)
            }
            Err(e) if e.is_feature_not_found() || e.is_no_candidates() => {
                debug!(func, group_id, code = ?e.code(), "xfyun voiceprint: nothing matched");
                Err(e)
            }
            Err(e) => {
                warn!(func, group_id, code = ?e.code(), error = %e, "xfyun voiceprint failed");
                Err(e)
            }
        }
    }

    async fn execute_json<R: DeserializeOwned>(
        &self,
        group_id: &str,
        op: &Operation<'_>,
    ) -> Result<R> {
        let text = self.execute(group_id, op).await?;
        serde_json::from_slice(&text)
            .map_err(|e| Error::Protocol(format!("{} result: {}", op.func(), e)))
    }

    /// Creates a group.
    pub async fn create_group(
        &self,
        group_id: &str,
        group_name: &str,
        group_info: &str,
    ) -> Result<GroupInfo> {
        self.execute_json(
            group_id,
            &Operation::CreateGroup {
                group_name,
                group_info,
            },
        )
        .await
    }

    /// Deletes a group.
    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.execute(group_id, &Operation::DeleteGroup).await?;
        Ok(())
    }

    /// Enrolls `audio` as a new feature and returns the feature id.
    pub async fn create_feature(
        &self,
        group_id: &str,
        feature_id: &str,
        feature_info: &str,
        audio: &[u8],
    ) -> Result<String> {
        let created: CreatedFeature = self
            .execute_json(
                group_id,
                &Operation::CreateFeature {
                    feature_id,
                    feature_info,
                    audio,
                },
            )
            .await?;
        if created.feature_id.is_empty() {
            return Ok(feature_id.to_string());
        }
        Ok(created.feature_id)
    }

    /// Replaces an enrolled feature.
    pub async fn update_feature(
        &self,
        group_id: &str,
        feature_id: &str,
        feature_info: &str,
        audio: &[u8],
    ) -> Result<()> {
        self.execute(
            group_id,
            &Operation::UpdateFeature {
                feature_id,
                feature_info,
                audio,
            },
        )
        .await?;
        Ok(())
    }

    /// Deletes an enrolled feature.
    pub async fn delete_feature(&self, group_id: &str, feature_id: &str) -> Result<()> {
        self.execute(group_id, &Operation::DeleteFeature { feature_id })
            .await?;
        Ok(())
    }

    /// Lists the features enrolled in a group.
    pub async fn query_feature_list(&self, group_id: &str) -> Result<Vec<FeatureEntry>> {
        self.execute_json(group_id, &Operation::QueryFeatureList)
            .await
    }

    /// 1:N search; returns candidates ranked by the engine, best first.
    pub async fn search_fea(
        &self,
        group_id: &str,
        audio: &[u8],
        top_k: u32,
    ) -> Result<Vec<FeatureScore>> {
        let list: ScoreList = self
            .execute_json(group_id, &Operation::SearchFea { top_k, audio })
            .await?;
        Ok(list.score_list)
    }

    /// 1:1 comparison of `audio` against `dst_feature_id`.
    pub async fn search_score_fea(
        &self,
        group_id: &str,
        dst_feature_id: &str,
        audio: &[u8],
    ) -> Result<FeatureScore> {
        self.execute_json(
            group_id,
            &Operation::SearchScoreFea {
                dst_feature_id,
                audio,
            },
        )
        .await
    }
}
