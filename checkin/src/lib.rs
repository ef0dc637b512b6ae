//! Voice check-in.
//!
//! A caller uploads a short WAV sample under an address (the identity they
//! claim). The pipeline:
//!
//! 1. normalizes the audio ([`voxgate_audio::AudioNormalizer`])
//! 2. optionally checks that the caller said the expected phrase
//!    ([`SpeechVerifier`])
//! 3. confirms, rejects or enrolls the voiceprint ([`DecisionEngine`])
//! 4. records the report ([`ResultRegistry`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voxgate_audio::AudioNormalizer;
//! use voxgate_checkin::{CheckinPipeline, CheckinRequest, DecisionEngine, MemoryRegistry};
//!
//! # async fn run(wav: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = voxgate_xfyun::Client::builder("app-id")
//!     .api_key("key")
//!     .api_secret("secret")
//!     .build()?;
//! let engine = DecisionEngine::new(Arc::new(client.voiceprint()), "group_fzm");
//! let pipeline = CheckinPipeline::new(AudioNormalizer::default(), engine)
//!     .with_registry(Arc::new(MemoryRegistry::new()));
//!
//! let outcome = pipeline
//!     .run(&CheckinRequest {
//!         address: "alice".into(),
//!         audio: wav,
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

mod archive;
pub mod decision;
mod error;
mod identity;
mod outcome;
mod pipeline;
mod registry;
pub mod speech;

pub use archive::AudioArchive;
pub use decision::{DecisionEngine, VoiceprintBackend, DEFAULT_THRESHOLD, NEAREST_TOP_K};
pub use error::{CheckinError, Result};
pub use identity::{feature_id_for, Identity, FEATURE_ID_MAX_CHARS};
pub use outcome::{
    CheckinReport, Outcome, Rejection, RESULT_CONFIRMED, RESULT_ENROLLED, RESULT_FAILED,
    RESULT_UNKNOWN,
};
pub use pipeline::{CheckinPipeline, CheckinRequest};
pub use registry::{MemoryRegistry, ResultRegistry};
pub use speech::{language_for, SpeechCheck, SpeechVerifier, Transcriber};
