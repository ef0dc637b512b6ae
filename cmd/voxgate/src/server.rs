//! Check-in HTTP server.
//!
//! API endpoints:
//! - POST /upload?address=&id=&language=&text=  - WAV body, runs one check-in
//! - GET  /upload/result?address=               - latest CheckinReport JSON

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use voxgate_audio::{AudioNormalizer, CommandEncoder};
use voxgate_checkin::{
    AudioArchive, CheckinError, CheckinPipeline, CheckinRequest, DecisionEngine, MemoryRegistry,
    Outcome, SpeechVerifier,
};

use crate::config::{ClientSettings, FileConfig, ServeSettings};
use crate::{Cli, ServeArgs};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const MISSING_ADDRESS: &str = "Missing address parameter";

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<CheckinPipeline>,
}

impl AppState {
    pub fn new(pipeline: CheckinPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Resolves settings, wires the pipeline and serves until the process exits.
pub async fn run(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let file = FileConfig::from_cli(cli)?;
    let settings = ServeSettings::resolve(cli, args, &file)?;
    let client = ClientSettings::resolve(cli, &file)?.client()?;

    let encoder = CommandEncoder::ffmpeg(&settings.encoder).with_timeout(settings.encoder_timeout);
    let engine = DecisionEngine::new(Arc::new(client.voiceprint()), &settings.group)
        .with_threshold(settings.threshold);
    let mut pipeline = CheckinPipeline::new(AudioNormalizer::new(Arc::new(encoder)), engine)
        .with_registry(Arc::new(MemoryRegistry::new()));
    if settings.speech_gate {
        pipeline = pipeline.with_speech(SpeechVerifier::new(Arc::new(client.iat())));
    }
    if let Some(dir) = &settings.audio_dir {
        pipeline = pipeline.with_archive(AudioArchive::new(dir));
    }

    info!(
        port = settings.port,
        group = %settings.group,
        threshold = settings.threshold,
        speech_gate = settings.speech_gate,
        encoder = %settings.encoder,
        "starting check-in server"
    );
    serve(&format!(":{}", settings.port), AppState::new(pipeline)).await
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-csrf-token"),
        ]);

    Router::new()
        .route("/upload", post(upload))
        .route("/upload/result", get(result))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves the router.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let addr = parse_addr(addr)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Parse address string to SocketAddr. `:8888` listens on all interfaces.
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

#[derive(Debug, Default, Deserialize)]
struct UploadParams {
    #[serde(default)]
    address: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultParams {
    #[serde(default)]
    address: String,
}

async fn upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    if params.address.is_empty() {
        return (StatusCode::BAD_REQUEST, MISSING_ADDRESS).into_response();
    }

    let req = CheckinRequest {
        address: params.address,
        id: params.id,
        language: params.language,
        phrase: params.text,
        audio: body.to_vec(),
    };

    match state.pipeline.run(&req).await {
        Ok(outcome @ (Outcome::Confirmed { .. } | Outcome::Enrolled { .. })) => {
            (StatusCode::OK, outcome.to_string()).into_response()
        }
        Ok(outcome @ Outcome::Rejected(_)) => {
            (StatusCode::BAD_REQUEST, outcome.to_string()).into_response()
        }
        Err(CheckinError::MissingAddress) => {
            (StatusCode::BAD_REQUEST, MISSING_ADDRESS).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn result(State(state): State<AppState>, Query(params): Query<ResultParams>) -> Response {
    if params.address.is_empty() {
        return (StatusCode::BAD_REQUEST, MISSING_ADDRESS).into_response();
    }
    Json(state.pipeline.report(&params.address)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Mutex;
    use voxgate_audio::Mp3Encoder;
    use voxgate_checkin::{CheckinReport, VoiceprintBackend, RESULT_ENROLLED, RESULT_FAILED};
    use voxgate_xfyun::{status_code, Error, FeatureScore};

    struct FakeMp3;

    #[async_trait]
    impl Mp3Encoder for FakeMp3 {
        async fn encode(&self, _wav: &[u8]) -> voxgate_audio::Result<Vec<u8>> {
            Ok(b"ID3".to_vec())
        }
    }

    /// Keeps enrolled ids in memory; "mallory" is already enrolled with a
    /// voice that always matches the sample.
    #[derive(Default)]
    struct MemoryBackend {
        enrolled: Mutex<Vec<String>>,
        broken: bool,
    }

    #[async_trait]
    impl VoiceprintBackend for MemoryBackend {
        async fn confirm(
            &self,
            _g: &str,
            f: &str,
            _mp3: &[u8],
        ) -> voxgate_xfyun::Result<FeatureScore> {
            if self.broken {
                return Err(Error::api(10105, "illegal access", 200));
            }
            if self.enrolled.lock().unwrap().iter().any(|e| e == f) {
                return Ok(FeatureScore {
                    feature_id: f.to_string(),
                    score: 0.9,
                    feature_info: f.to_string(),
                });
            }
            Err(Error::api(status_code::FEATURE_NOT_FOUND, "not found", 200))
        }

        async fn nearest(
            &self,
            _g: &str,
            _mp3: &[u8],
            _k: u32,
        ) -> voxgate_xfyun::Result<Vec<FeatureScore>> {
            match self.enrolled.lock().unwrap().first() {
                Some(f) => Ok(vec![FeatureScore {
                    feature_id: f.clone(),
                    score: 0.9,
                    feature_info: f.clone(),
                }]),
                None => Err(Error::api(status_code::NO_CANDIDATES, "empty", 200)),
            }
        }

        async fn enroll(
            &self,
            _g: &str,
            f: &str,
            _info: &str,
            _mp3: &[u8],
        ) -> voxgate_xfyun::Result<String> {
            self.enrolled.lock().unwrap().push(f.to_string());
            Ok(f.to_string())
        }
    }

    fn wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..800 {
            writer.write_sample((i * 7 % 3000) as i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    async fn spawn(backend: MemoryBackend) -> String {
        let engine = DecisionEngine::new(Arc::new(backend), "group_fzm");
        let pipeline = CheckinPipeline::new(AudioNormalizer::new(Arc::new(FakeMp3)), engine)
            .with_registry(Arc::new(MemoryRegistry::new()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AppState::new(pipeline));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post_upload(base: &str, query: &str) -> (u16, String) {
        let resp = reqwest::Client::new()
            .post(format!("{}/upload?{}", base, query))
            .body(wav())
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.text().await.unwrap())
    }

    async fn get_result(base: &str, address: &str) -> CheckinReport {
        reqwest::get(format!("{}/upload/result?address={}", base, address))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_enroll_then_confirm() {
        let base = spawn(MemoryBackend::default()).await;

        let (status, body) = post_upload(&base, "address=alice&id=u1").await;
        assert_eq!(status, 200);
        assert_eq!(body, "create new feature for you: alice");

        let report = get_result(&base, "alice").await;
        assert_eq!(report.result, RESULT_ENROLLED);
        assert_eq!(report.id, "u1");

        let (status, body) = post_upload(&base, "address=alice&id=u2").await;
        assert_eq!(status, 200);
        assert_eq!(body, "yes, you are alice");
    }

    #[tokio::test]
    async fn test_other_voice_rejected() {
        let backend = MemoryBackend::default();
        backend.enrolled.lock().unwrap().push("mallory".to_string());
        let base = spawn(backend).await;

        let (status, body) = post_upload(&base, "address=alice").await;
        assert_eq!(status, 400);
        assert_eq!(body, "oh, you are mallory not alice");

        let report = get_result(&base, "alice").await;
        assert_eq!(report.result, RESULT_FAILED);
        assert_eq!(report.error, "you are mallory not alice");
    }

    #[tokio::test]
    async fn test_engine_error_is_500() {
        let base = spawn(MemoryBackend {
            broken: true,
            ..Default::default()
        })
        .await;

        let (status, body) = post_upload(&base, "address=alice").await;
        assert_eq!(status, 500);
        assert!(body.contains("10105"), "{}", body);
        assert_eq!(get_result(&base, "alice").await.result, RESULT_FAILED);
    }

    #[tokio::test]
    async fn test_missing_address() {
        let base = spawn(MemoryBackend::default()).await;

        let (status, body) = post_upload(&base, "id=u1").await;
        assert_eq!(status, 400);
        assert_eq!(body, MISSING_ADDRESS);

        let resp = reqwest::get(format!("{}/upload/result", base)).await.unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_unknown_result() {
        let base = spawn(MemoryBackend::default()).await;
        let report = get_result(&base, "nobody").await;
        assert_eq!(report.result, -1);
        assert_eq!(report.error, "sorry, no result for the address:nobody");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let base = spawn(MemoryBackend::default()).await;
        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{}/upload", base))
            .header("origin", "http://example.com")
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[test]
    fn test_parse_addr() {
        assert_eq!(parse_addr(":8888").unwrap().port(), 8888);
        assert_eq!(
            parse_addr("127.0.0.1:9000").unwrap(),
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_addr("nonsense").is_err());
    }
}
