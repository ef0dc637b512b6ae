//! Three-stage voiceprint decision: confirm, nearest neighbor, enroll.
//!
//! ```text
//! confirm(claimed) ──found, same id──► score > t ? Confirmed : Rejected
//!      │ FEATURE_NOT_FOUND / other id
//!      ▼
//! nearest(group) ──top == claimed──► Conflict
//!      │         ──score >= t──────► Rejected(belongs to top)
//!      │ NO_CANDIDATES / below t
//!      ▼
//! enroll(claimed, full address) ───► Enrolled
//! ```
//!
//! The two comparisons differ on purpose: the confirm path needs strictly
//! more than the threshold, the nearest-neighbor path rejects at equality.
//!
//! Nothing serializes concurrent check-ins for the same identity. Two
//! first-time requests racing through stage 2 both enroll.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use voxgate_xfyun::{FeatureScore, VoiceprintService};

use crate::error::{CheckinError, Result};
use crate::identity::Identity;
use crate::outcome::{Outcome, Rejection};

/// Default similarity threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.36;

/// Number of candidates asked from the nearest-neighbor search.
pub const NEAREST_TOP_K: u32 = 1;

/// The voiceprint operations the engine needs.
#[async_trait]
pub trait VoiceprintBackend: Send + Sync {
    /// 1:1 comparison against `feature_id`.
    async fn confirm(
        &self,
        group_id: &str,
        feature_id: &str,
        mp3: &[u8],
    ) -> voxgate_xfyun::Result<FeatureScore>;

    /// 1:N search over the group, best first.
    async fn nearest(
        &self,
        group_id: &str,
        mp3: &[u8],
        top_k: u32,
    ) -> voxgate_xfyun::Result<Vec<FeatureScore>>;

    /// Enrolls `mp3` under `feature_id`.
    async fn enroll(
        &self,
        group_id: &str,
        feature_id: &str,
        feature_info: &str,
        mp3: &[u8],
    ) -> voxgate_xfyun::Result<String>;
}

#[async_trait]
impl VoiceprintBackend for VoiceprintService {
    async fn confirm(
        &self,
        group_id: &str,
        feature_id: &str,
        mp3: &[u8],
    ) -> voxgate_xfyun::Result<FeatureScore> {
        self.search_score_fea(group_id, feature_id, mp3).await
    }

    async fn nearest(
        &self,
        group_id: &str,
        mp3: &[u8],
        top_k: u32,
    ) -> voxgate_xfyun::Result<Vec<FeatureScore>> {
        self.search_fea(group_id, mp3, top_k).await
    }

    async fn enroll(
        &self,
        group_id: &str,
        feature_id: &str,
        feature_info: &str,
        mp3: &[u8],
    ) -> voxgate_xfyun::Result<String> {
        self.create_feature(group_id, feature_id, feature_info, mp3)
            .await
    }
}

/// Decides confirm / reject / enroll for one sample.
#[derive(Clone)]
pub struct DecisionEngine {
    backend: Arc<dyn VoiceprintBackend>,
    group_id: String,
    threshold: f64,
}

impl DecisionEngine {
    /// Creates an engine over `group_id` with the default threshold.
    pub fn new(backend: Arc<dyn VoiceprintBackend>, group_id: impl Into<String>) -> Self {
        Self {
            backend,
            group_id: group_id.into(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Sets the similarity threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the group id.
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Returns the similarity threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Runs the decision for `identity` on the MP3 sample.
    pub async fn decide(&self, identity: &Identity, mp3: &[u8]) -> Result<Outcome> {
        let claimed = identity.feature_id();

        // Stage 1: is this the voice enrolled under the claimed id?
        match self.backend.confirm(&self.group_id, claimed, mp3).await {
            Ok(hit) if hit.feature_id == claimed => {
                debug!(feature_id = claimed, score = hit.score, "1:1 hit");
                if hit.score > self.threshold {
                    info!(feature_id = claimed, score = hit.score, "confirmed");
                    return Ok(Outcome::Confirmed {
                        feature_id: claimed.to_string(),
                        score: hit.score,
                    });
                }
                warn!(
                    feature_id = claimed,
                    score = hit.score,
                    threshold = self.threshold,
                    "score too low"
                );
                return Ok(Outcome::Rejected(Rejection::ScoreTooLow {
                    feature_id: claimed.to_string(),
                    score: hit.score,
                }));
            }
            Ok(hit) => {
                debug!(
                    feature_id = claimed,
                    returned = %hit.feature_id,
                    "1:1 returned another feature"
                );
            }
            Err(e) if e.is_feature_not_found() => {
                debug!(feature_id = claimed, "1:1 not enrolled");
            }
            Err(e) => return Err(e.into()),
        }

        // Stage 2: does the voice belong to somebody else?
        let top = match self
            .backend
            .nearest(&self.group_id, mp3, NEAREST_TOP_K)
            .await
        {
            Ok(list) => list.into_iter().next(),
            Err(e) if e.is_no_candidates() => None,
            Err(e) => return Err(e.into()),
        };
        if let Some(top) = top {
            debug!(
                feature_id = claimed,
                top = %top.feature_id,
                score = top.score,
                "1:N top candidate"
            );
            if top.feature_id == claimed {
                warn!(feature_id = claimed, "1:1 not found but 1:N found");
                return Err(CheckinError::Conflict {
                    feature_id: claimed.to_string(),
                });
            }
            if top.score >= self.threshold {
                warn!(
                    feature_id = claimed,
                    other = %top.feature_id,
                    score = top.score,
                    "voice belongs to another identity"
                );
                return Ok(Outcome::Rejected(Rejection::BelongsToOther {
                    claimed: claimed.to_string(),
                    other: top.feature_id,
                    score: top.score,
                }));
            }
        }

        // Stage 3: new voice, enroll it.
        let feature_id = self
            .backend
            .enroll(&self.group_id, claimed, identity.feature_info(), mp3)
            .await?;
        info!(feature_id = %feature_id, "enrolled");
        Ok(Outcome::Enrolled { feature_id })
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use parking_lot::Mutex;
    use voxgate_xfyun::{status_code, Error};

    /// Scripted reply of one stage.
    #[derive(Clone)]
    pub enum Reply<T> {
        Ok(T),
        Code(i32),
    }

    impl<T: Clone> Reply<T> {
        fn get(&self) -> voxgate_xfyun::Result<T> {
            match self {
                Reply::Ok(v) => Ok(v.clone()),
                Reply::Code(code) => Err(Error::api(*code, "scripted", 200)),
            }
        }
    }

    /// Records every call and answers from a script.
    pub struct ScriptedBackend {
        pub confirm: Reply<FeatureScore>,
        pub nearest: Reply<Vec<FeatureScore>>,
        pub enroll: Reply<String>,
        pub calls: Mutex<Vec<String>>,
        pub enrolled: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        /// A backend for a first-time caller in an empty group.
        pub fn empty_group() -> Self {
            Self {
                confirm: Reply::Code(status_code::FEATURE_NOT_FOUND),
                nearest: Reply::Code(status_code::NO_CANDIDATES),
                enroll: Reply::Ok(String::new()),
                calls: Mutex::new(Vec::new()),
                enrolled: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    pub fn score(feature_id: &str, score: f64) -> FeatureScore {
        FeatureScore {
            feature_id: feature_id.to_string(),
            score,
            feature_info: feature_id.to_string(),
        }
    }

    #[async_trait]
    impl VoiceprintBackend for ScriptedBackend {
        async fn confirm(
            &self,
            _g: &str,
            _f: &str,
            _mp3: &[u8],
        ) -> voxgate_xfyun::Result<FeatureScore> {
            self.calls.lock().push("confirm".into());
            self.confirm.get()
        }

        async fn nearest(
            &self,
            _g: &str,
            _mp3: &[u8],
            top_k: u32,
        ) -> voxgate_xfyun::Result<Vec<FeatureScore>> {
            self.calls.lock().push(format!("nearest:{}", top_k));
            self.nearest.get()
        }

        async fn enroll(
            &self,
            _g: &str,
            feature_id: &str,
            feature_info: &str,
            _mp3: &[u8],
        ) -> voxgate_xfyun::Result<String> {
            self.calls.lock().push("enroll".into());
            self.enrolled
                .lock()
                .push((feature_id.to_string(), feature_info.to_string()));
            let id = self.enroll.get()?;
            Ok(if id.is_empty() { feature_id.to_string() } else { id })
        }
    }
}
