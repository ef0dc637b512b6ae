//! iFlytek open platform SDK for Rust.
//!
//! Covers the two capabilities used by voice check-in:
//!
//! - Voiceprint groups (`s782b4996`): create/delete groups, enroll and
//!   remove features, 1:1 (`searchScoreFea`) and 1:N (`searchFea`) search
//! - Dictation (IAT): streaming speech recognition over WebSocket
//!
//! Both are authenticated with HMAC-SHA256 signed URLs, see [`auth`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voxgate_xfyun::{Client, IatRequest, Language};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("your-app-id")
//!         .api_key("your-api-key")
//!         .api_secret("your-api-secret")
//!         .build()?;
//!
//!     let pcm: Vec<u8> = std::fs::read("sample.pcm")?;
//!     let text = client
//!         .iat()
//!         .transcribe(&pcm, &IatRequest::new(Language::ZhCn))
//!         .await?;
//!     println!("heard: {}", text);
//!
//!     let mp3: Vec<u8> = std::fs::read("sample.mp3")?;
//!     let hit = client
//!         .voiceprint()
//!         .search_score_fea("group_fzm", "alice", &mp3)
//!         .await?;
//!     println!("score: {}", hit.score);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
mod error;
pub mod http;
mod iat;
mod types;
mod voiceprint;

pub use auth::Signer;
pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT};
pub use error::{status_code, Error, Result};
pub use iat::{
    build_frames, session_timeout, IatCandidate, IatData, IatRequest, IatResponse, IatResult,
    IatService, IatWord, DEFAULT_FRAME_INTERVAL, DEFAULT_IAT_URL, FRAME_BYTES,
};
pub use types::*;
pub use voiceprint::{
    build_request, decode_response, Operation, VoiceprintService, DEFAULT_VOICEPRINT_URL,
};
