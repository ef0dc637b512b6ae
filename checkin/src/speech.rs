//! Speech-content gate.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use voxgate_xfyun::{IatRequest, IatService, Language};

use crate::error::{CheckinError, Result};

/// Speech-to-text over 16 kHz mono PCM.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the transcript of `pcm`.
    async fn transcribe(&self, pcm: &[u8], language: Language) -> voxgate_xfyun::Result<String>;
}

#[async_trait]
impl Transcriber for IatService {
    async fn transcribe(&self, pcm: &[u8], language: Language) -> voxgate_xfyun::Result<String> {
        IatService::transcribe(self, pcm, &IatRequest::new(language)).await
    }
}

/// Maps a request language tag to a dictation language.
///
/// `"zh"` and the empty tag mean Mandarin; anything else means English.
pub fn language_for(tag: &str) -> Language {
    match tag {
        "" | "zh" => Language::ZhCn,
        _ => Language::EnUs,
    }
}

/// Removes every whitespace character.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Result of the speech gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCheck {
    /// Transcript with whitespace removed.
    pub transcript: String,
    /// Expected phrase with whitespace removed.
    pub expected: String,
    /// Whether the phrase occurs in the transcript.
    pub matched: bool,
}

impl SpeechCheck {
    /// Compares a transcript with the expected phrase.
    pub fn compare(transcript: &str, expected: &str) -> Self {
        let transcript = strip_whitespace(transcript);
        let expected = strip_whitespace(expected);
        let matched = transcript.contains(&expected);
        Self {
            transcript,
            expected,
            matched,
        }
    }
}

/// Checks that a sample says the expected phrase.
#[derive(Clone)]
pub struct SpeechVerifier {
    transcriber: Arc<dyn Transcriber>,
}

impl SpeechVerifier {
    /// Creates a verifier on top of a transcriber.
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }

    /// Transcribes `pcm` and looks for `expected` in the transcript.
    pub async fn verify(&self, pcm: &[u8], language: &str, expected: &str) -> Result<SpeechCheck> {
        let language = language_for(language);
        let transcript = self
            .transcriber
            .transcribe(pcm, language)
            .await
            .map_err(|e| {
                warn!(error = %e, "transcription failed");
                CheckinError::Transcription(e.to_string())
            })?;

        let check = SpeechCheck::compare(&transcript, expected);
        debug!(
            language = language.as_str(),
            transcript = %check.transcript,
            expected = %check.expected,
            matched = check.matched,
            "speech gate"
        );
        Ok(check)
    }
}
