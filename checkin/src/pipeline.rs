//! One check-in, end to end.

use std::sync::Arc;

use tracing::{info, warn};
use voxgate_audio::AudioNormalizer;

use crate::archive::AudioArchive;
use crate::decision::DecisionEngine;
use crate::error::{CheckinError, Result};
use crate::identity::Identity;
use crate::outcome::{CheckinReport, Outcome, Rejection};
use crate::registry::ResultRegistry;
use crate::speech::SpeechVerifier;

/// An inbound check-in.
#[derive(Debug, Clone, Default)]
pub struct CheckinRequest {
    /// Claimed identity.
    pub address: String,
    /// Caller-supplied upload id.
    pub id: String,
    /// Language tag for the speech gate.
    pub language: String,
    /// Phrase the caller was asked to say.
    pub phrase: Option<String>,
    /// Uploaded WAV audio.
    pub audio: Vec<u8>,
}

/// Runs normalization, the optional speech gate and the voiceprint decision,
/// then records the report.
#[derive(Clone)]
pub struct CheckinPipeline {
    normalizer: AudioNormalizer,
    engine: DecisionEngine,
    speech: Option<SpeechVerifier>,
    registry: Option<Arc<dyn ResultRegistry>>,
    archive: Option<AudioArchive>,
}

impl CheckinPipeline {
    /// Creates a pipeline without speech gate, registry or archive.
    pub fn new(normalizer: AudioNormalizer, engine: DecisionEngine) -> Self {
        Self {
            normalizer,
            engine,
            speech: None,
            registry: None,
            archive: None,
        }
    }

    /// Enables the speech gate.
    pub fn with_speech(mut self, verifier: SpeechVerifier) -> Self {
        self.speech = Some(verifier);
        self
    }

    /// Records every report in `registry`.
    pub fn with_registry(mut self, registry: Arc<dyn ResultRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Saves every upload to `archive`.
    pub fn with_archive(mut self, archive: AudioArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Returns the decision engine.
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Runs one check-in.
    ///
    /// A request with an empty address fails before anything is recorded.
    /// Every other request leaves a report in the registry.
    pub async fn run(&self, req: &CheckinRequest) -> Result<Outcome> {
        let identity = Identity::new(req.address.as_str()).ok_or(CheckinError::MissingAddress)?;
        info!(
            id = %req.id,
            address = %req.address,
            feature_id = identity.feature_id(),
            language = %req.language,
            phrase = req.phrase.as_deref().unwrap_or(""),
            bytes = req.audio.len(),
            "check-in"
        );

        let result = self.decide(&identity, req).await;
        match &result {
            Ok(outcome) => info!(
                feature_id = identity.feature_id(),
                code = outcome.result_code(),
                "{}",
                outcome
            ),
            Err(e) => warn!(feature_id = identity.feature_id(), error = %e, "check-in failed"),
        }

        if let Some(registry) = &self.registry {
            let report = CheckinReport::from_result(
                &req.id,
                identity.feature_id(),
                &result,
                chrono::Utc::now().timestamp(),
            );
            registry.record(identity.address(), report);
        }
        result
    }

    /// Latest report for `address`, or the "no result" placeholder.
    pub fn report(&self, address: &str) -> CheckinReport {
        self.registry
            .as_ref()
            .and_then(|r| r.lookup(address))
            .unwrap_or_else(|| CheckinReport::unknown(address))
    }

    async fn decide(&self, identity: &Identity, req: &CheckinRequest) -> Result<Outcome> {
        if let Some(archive) = &self.archive {
            let ts = chrono::Utc::now().timestamp();
            if let Err(e) = archive.save(identity.address(), ts, &req.audio).await {
                warn!(dir = %archive.dir().display(), error = %e, "failed to archive upload");
            }
        }

        let audio = self.normalizer.normalize(&req.audio).await?;

        let phrase = req.phrase.as_deref().filter(|p| !p.trim().is_empty());
        if let (Some(verifier), Some(phrase)) = (&self.speech, phrase) {
            let check = verifier.verify(&audio.pcm, &req.language, phrase).await?;
            if !check.matched {
                return Ok(Outcome::Rejected(Rejection::ContentMismatch {
                    transcript: check.transcript,
                    expected: check.expected,
                }));
            }
        }

        self.engine.decide(identity, &audio.mp3).await
    }
}
