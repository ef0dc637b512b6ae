//! Dictation (IAT) service.
//!
//! Streams 16 kHz 16-bit mono PCM over a signed WebSocket and collects the
//! recognized text. The session is one request per connection:
//!
//! - first frame: `common` + `business` + `data` with `status = 0`
//! - middle frames: `data` with `status = 1`
//! - last frame: `data` with `status = 2` and empty audio
//!
//! The server answers every frame it has results for; `data.status == 2`
//! marks the final answer.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::debug;

use crate::{
    error::{status_code, Error, Result},
    http::HttpClient,
    types::Language,
};

/// Default dictation endpoint.
pub const DEFAULT_IAT_URL: &str = "wss://iat-api.xfyun.cn/v2/iat";

/// Bytes of PCM per frame (40 ms at 16 kHz, 16-bit, mono).
pub const FRAME_BYTES: usize = 1280;

/// Default pause between frames, matching real-time playback.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(40);

const FRAME_FIRST: i32 = 0;
const FRAME_CONTINUE: i32 = 1;
const FRAME_LAST: i32 = 2;

const AUDIO_FORMAT: &str = "audio/L16;rate=16000";

/// Dictation request options.
#[derive(Debug, Clone)]
pub struct IatRequest {
    /// Recognition language.
    pub language: Language,
    /// Recognition domain.
    pub domain: String,
    /// Accent, only meaningful for Mandarin.
    pub accent: String,
    /// Pause between frames.
    pub frame_interval: Duration,
}

impl Default for IatRequest {
    fn default() -> Self {
        Self {
            language: Language::ZhCn,
            domain: "iat".to_string(),
            accent: "mandarin".to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }
}

impl IatRequest {
    /// Creates request options for `language` with default settings.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            ..Default::default()
        }
    }
}

/// Dictation service.
pub struct IatService {
    http: Arc<HttpClient>,
}

impl IatService {
    /// Creates a new dictation service.
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Transcribes a complete PCM buffer.
    ///
    /// The whole session is bounded by [`session_timeout`]: the client
    /// timeout plus the time spent pacing the frames.
    pub async fn transcribe(&self, pcm: &[u8], req: &IatRequest) -> Result<String> {
        let timeout = session_timeout(self.http.timeout(), pcm.len(), req);
        match tokio::time::timeout(timeout, self.run_session(pcm, req)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "dictation did not finish within {:?}",
                timeout
            ))),
        }
    }

    async fn run_session(&self, pcm: &[u8], req: &IatRequest) -> Result<String> {
        let url = self.http.signer().sign_url(self.http.iat_url(), "GET")?;
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let frames = build_frames(self.http.app_id(), pcm, req)?;
        let interval = req.frame_interval;
        debug!(frames = frames.len(), language = req.language.as_str(), "iat session opened");

        let sender = async move {
            for (i, frame) in frames.into_iter().enumerate() {
                if i > 0 && !interval.is_zero() {
                    tokio::time::sleep(interval).await;
                }
                write.send(WsMessage::Text(frame.into())).await?;
            }
            Ok::<_, Error>(write)
        };

        let receiver = async {
            let mut transcript = Transcript::default();
            while let Some(msg) = read.next().await {
                match msg? {
                    WsMessage::Text(text) => {
                        let resp: IatResponse = serde_json::from_str(text.as_str())
                            .map_err(|e| Error::Protocol(format!("iat response: {}", e)))?;
                        if transcript.push(resp)? {
                            return Ok(transcript.text());
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            Err(Error::Protocol(
                "iat connection closed before the final result".to_string(),
            ))
        };

        let (sent, text) = tokio::join!(sender, receiver);
        let text = text?;
        let mut write = sent?;
        let _ = write.close().await;
        Ok(text)
    }
}

/// Upper bound for a dictation session over `pcm_len` bytes of PCM.
///
/// Frames go out at `req.frame_interval`, so long recordings need longer
/// than a plain request; `base` covers connecting and the final answer.
pub fn session_timeout(base: Duration, pcm_len: usize, req: &IatRequest) -> Duration {
    let frames = u32::try_from(pcm_len.div_ceil(FRAME_BYTES)).unwrap_or(u32::MAX);
    base.saturating_add(req.frame_interval.saturating_mul(frames))
}

/// Splits `pcm` into serialized frames.
pub fn build_frames(app_id: &str, pcm: &[u8], req: &IatRequest) -> Result<Vec<String>> {
    let mut frames = Vec::with_capacity(pcm.len() / FRAME_BYTES + 2);

    for (i, chunk) in pcm.chunks(FRAME_BYTES).enumerate() {
        let frame = if i == 0 {
            IatFrame::first(app_id, req, chunk)
        } else {
            IatFrame::data(FRAME_CONTINUE, chunk)
        };
        frames.push(serde_json::to_string(&frame)?);
    }

    // Empty audio still opens the session properly.
    let last = if pcm.is_empty() {
        IatFrame {
            data: FrameData::new(FRAME_LAST, &[]),
            ..IatFrame::first(app_id, req, &[])
        }
    } else {
        IatFrame::data(FRAME_LAST, &[])
    };
    frames.push(serde_json::to_string(&last)?);

    Ok(frames)
}

// ================== Wire Types ==================

#[derive(Debug, Serialize)]
struct IatFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    common: Option<FrameCommon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    business: Option<FrameBusiness>,
    data: FrameData,
}

impl IatFrame {
    fn first(app_id: &str, req: &IatRequest, audio: &[u8]) -> Self {
        Self {
            common: Some(FrameCommon {
                app_id: app_id.to_string(),
            }),
            business: Some(FrameBusiness {
                language: req.language.as_str().to_string(),
                domain: req.domain.clone(),
                accent: req.accent.clone(),
            }),
            data: FrameData::new(FRAME_FIRST, audio),
        }
    }

    fn data(status: i32, audio: &[u8]) -> Self {
        Self {
            common: None,
            business: None,
            data: FrameData::new(status, audio),
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameCommon {
    app_id: String,
}

#[derive(Debug, Serialize)]
struct FrameBusiness {
    language: String,
    domain: String,
    accent: String,
}

#[derive(Debug, Serialize)]
struct FrameData {
    status: i32,
    format: String,
    encoding: String,
    audio: String,
}

impl FrameData {
    fn new(status: i32, audio: &[u8]) -> Self {
        Self {
            status,
            format: AUDIO_FORMAT.to_string(),
            encoding: "raw".to_string(),
            audio: BASE64.encode(audio),
        }
    }
}

/// One server message.
#[derive(Debug, Deserialize)]
pub struct IatResponse {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sid: String,
    #[serde(default)]
    pub data: Option<IatData>,
}

/// `data` of a server message.
#[derive(Debug, Deserialize)]
pub struct IatData {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub result: Option<IatResult>,
}

/// Recognition result of one sentence piece.
#[derive(Debug, Deserialize)]
pub struct IatResult {
    #[serde(default)]
    pub sn: i32,
    #[serde(default)]
    pub ls: bool,
    #[serde(default)]
    pub ws: Vec<IatWord>,
}

/// A word slot with its candidates.
#[derive(Debug, Deserialize)]
pub struct IatWord {
    #[serde(default)]
    pub cw: Vec<IatCandidate>,
}

/// A candidate for a word slot.
#[derive(Debug, Deserialize)]
pub struct IatCandidate {
    #[serde(default)]
    pub w: String,
}

impl IatResult {
    /// Concatenates the first candidate of every word slot.
    pub fn text(&self) -> String {
        self.ws
            .iter()
            .filter_map(|w| w.cw.first())
            .map(|c| c.w.as_str())
            .collect()
    }
}

/// Accumulates sentence pieces across server messages.
#[derive(Debug, Default)]
struct Transcript {
    pieces: Vec<String>,
}

impl Transcript {
    /// Adds a message; returns true when it was the final one.
    fn push(&mut self, resp: IatResponse) -> Result<bool> {
        if resp.code != status_code::SUCCESS {
            return Err(Error::api_with_sid(resp.code, resp.message, resp.sid, 101));
        }
        let Some(data) = resp.data else {
            return Ok(false);
        };
        if let Some(result) = data.result {
            self.pieces.push(result.text());
        }
        Ok(data.status == FRAME_LAST)
    }

    fn text(&self) -> String {
        self.pieces.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_build_frames_layout() {
        let pcm = vec![0u8; FRAME_BYTES * 2 + 10];
        let frames = build_frames("appid-1", &pcm, &IatRequest::new(Language::EnUs)).unwrap();
        assert_eq!(frames.len(), 4);

        let first: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(first["common"]["app_id"], "appid-1");
        assert_eq!(first["business"]["language"], "en_us");
        assert_eq!(first["business"]["domain"], "iat");
        assert_eq!(first["data"]["status"], 0);
        assert_eq!(first["data"]["format"], "audio/L16;rate=16000");
        assert_eq!(first["data"]["encoding"], "raw");

        let middle: Value = serde_json::from_str(&frames[2]).unwrap();
        assert!(middle.get("common").is_none());
        assert_eq!(middle["data"]["status"], 1);
        let audio = BASE64.decode(middle["data"]["audio"].as_str().unwrap()).unwrap();
        assert_eq!(audio.len(), 10);

        let last: Value = serde_json::from_str(&frames[3]).unwrap();
        assert_eq!(last["data"]["status"], 2);
        assert_eq!(last["data"]["audio"], "");
    }

    #[test]
    fn test_session_timeout_covers_pacing() {
        let base = Duration::from_secs(30);
        // One minute of 16 kHz 16-bit mono: 1500 frames at 40 ms.
        let minute = 16000 * 2 * 60;
        assert_eq!(
            session_timeout(base, minute, &IatRequest::default()),
            Duration::from_secs(90)
        );
        // A partial frame still costs one interval.
        assert_eq!(
            session_timeout(base, FRAME_BYTES + 1, &IatRequest::default()),
            base + DEFAULT_FRAME_INTERVAL * 2
        );
        assert_eq!(session_timeout(base, 0, &IatRequest::default()), base);

        let unpaced = IatRequest {
            frame_interval: Duration::ZERO,
            ..IatRequest::default()
        };
        assert_eq!(session_timeout(base, minute, &unpaced), base);
    }

    #[test]
    fn test_build_frames_empty_audio() {
        let frames = build_frames("appid-1", &[], &IatRequest::default()).unwrap();
        assert_eq!(frames.len(), 1);
        let only: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(only["common"]["app_id"], "appid-1");
        assert_eq!(only["business"]["language"], "zh_cn");
        assert_eq!(only["data"]["status"], 2);
    }

    fn response(json: &str) -> IatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_transcript_accumulates_until_final() {
        let mut t = Transcript::default();
        let done = t
            .push(response(
                r#"{"code":0,"message":"success","sid":"iat0","data":{"status":1,"result":{"sn":1,"ls":false,"ws":[{"cw":[{"w":"open"}]},{"cw":[{"w":" "}]}]}}}"#,
            ))
            .unwrap();
        assert!(!done);

        let done = t
            .push(response(
                r#"{"code":0,"message":"success","sid":"iat0","data":{"status":2,"result":{"sn":2,"ls":true,"ws":[{"cw":[{"w":"sesame"},{"w":"sesami"}]}]}}}"#,
            ))
            .unwrap();
        assert!(done);
        assert_eq!(t.text(), "open sesame");
    }

    #[test]
    fn test_transcript_error_code() {
        let mut t = Transcript::default();
        let err = t
            .push(response(
                r#"{"code":10165,"message":"invalid handle","sid":"iat1"}"#,
            ))
            .unwrap_err();
        assert_eq!(err.code(), Some(10165));
    }
}
