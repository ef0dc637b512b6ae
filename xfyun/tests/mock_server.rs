//! Client tests against local mock endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    Message,
};
use voxgate_xfyun::{auth, Client, Error, IatRequest, Language, Signer};

const APP_ID: &str = "app-test";
const API_KEY: &str = "key-test";
const API_SECRET: &str = "secret-test";
const PATH: &str = "/v1/private/s782b4996";

#[derive(Clone)]
struct MockState {
    addr: SocketAddr,
}

fn envelope_ok(result_key: &str, result: Value) -> Value {
    json!({
        "header": {"code": 0, "message": "success", "sid": "ase000"},
        "payload": {
            result_key: {
                "encoding": "utf8",
                "compress": "raw",
                "format": "json",
                "text": BASE64.encode(result.to_string()),
            }
        }
    })
}

fn envelope_err(code: i32, message: &str) -> Value {
    json!({"header": {"code": code, "message": message, "sid": "ase001"}})
}

/// Recomputes the signature the way the gateway does.
fn verify_signature(host: &str, query: &HashMap<String, String>) -> bool {
    let (Some(authorization), Some(date), Some(q_host)) =
        (query.get("authorization"), query.get("date"), query.get("host"))
    else {
        return false;
    };
    if q_host != host {
        return false;
    }
    let signer = Signer::new(API_KEY, API_SECRET);
    let origin = auth::signature_origin(host, date, "POST", PATH);
    match signer.signature(&origin) {
        Ok(sig) => &signer.authorization(&sig) == authorization,
        Err(_) => false,
    }
}

async fn voiceprint(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let host = state.addr.to_string();
    if !verify_signature(&host, &query) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "HMAC signature cannot be verified"})),
        );
    }
    if headers.get("appid").and_then(|v| v.to_str().ok()) != Some(APP_ID) {
        return (StatusCode::FORBIDDEN, Json(json!({"message": "appid mismatch"})));
    }

    let params = &body["parameter"]["s782b4996"];
    let func = params["func"].as_str().unwrap_or_default();
    let key = format!("{}Res", func);
    let reply = match func {
        "searchScoreFea" => match params["dstFeatureId"].as_str() {
            Some("alice") => envelope_ok(
                &key,
                json!({"featureId": "alice", "score": 0.82, "featureInfo": "alice"}),
            ),
            _ => envelope_err(23007, "feature not found"),
        },
        "searchFea" => {
            if params["groupId"] == "empty_group" {
                envelope_err(23008, "no feature in group")
            } else {
                envelope_ok(
                    &key,
                    json!({"scoreList": [
                        {"featureId": "bob", "score": 0.71, "featureInfo": "bob"}
                    ]}),
                )
            }
        }
        "createFeature" => envelope_ok(&key, json!({"featureId": params["featureId"]})),
        "queryFeatureList" => envelope_ok(
            &key,
            json!([
                {"featureId": "alice", "featureInfo": "alice"},
                {"featureId": "bob", "featureInfo": "bob"},
            ]),
        ),
        _ => envelope_err(10106, "invalid func"),
    };
    (StatusCode::OK, Json(reply))
}

async fn spawn_voiceprint_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route(PATH, post(voiceprint))
        .with_state(MockState { addr });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr, secret: &str) -> Client {
    Client::builder(APP_ID)
        .api_key(API_KEY)
        .api_secret(secret)
        .voiceprint_url(format!("http://{}{}", addr, PATH))
        .iat_url(format!("ws://{}/v2/iat", addr))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_search_score_fea_signed_roundtrip() {
    let addr = spawn_voiceprint_server().await;
    let client = client_for(addr, API_SECRET);

    let hit = client
        .voiceprint()
        .search_score_fea("group_fzm", "alice", b"mp3")
        .await
        .unwrap();
    assert_eq!(hit.feature_id, "alice");
    assert!((hit.score - 0.82).abs() < 1e-9);
}

#[tokio::test]
async fn test_search_score_fea_not_enrolled() {
    let addr = spawn_voiceprint_server().await;
    let client = client_for(addr, API_SECRET);

    let err = client
        .voiceprint()
        .search_score_fea("group_fzm", "ghost", b"mp3")
        .await
        .unwrap_err();
    assert!(err.is_feature_not_found());
}

#[tokio::test]
async fn test_search_fea_and_empty_group() {
    let addr = spawn_voiceprint_server().await;
    let client = client_for(addr, API_SECRET);

    let list = client
        .voiceprint()
        .search_fea("group_fzm", b"mp3", 1)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].feature_id, "bob");

    let err = client
        .voiceprint()
        .search_fea("empty_group", b"mp3", 1)
        .await
        .unwrap_err();
    assert!(err.is_no_candidates());
}

#[tokio::test]
async fn test_create_feature_and_list() {
    let addr = spawn_voiceprint_server().await;
    let client = client_for(addr, API_SECRET);

    let id = client
        .voiceprint()
        .create_feature("group_fzm", "carol", "carol", b"mp3")
        .await
        .unwrap();
    assert_eq!(id, "carol");

    let features = client
        .voiceprint()
        .query_feature_list("group_fzm")
        .await
        .unwrap();
    let ids: Vec<_> = features.iter().map(|f| f.feature_id.as_str()).collect();
    assert_eq!(ids, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_wrong_secret_is_auth_error() {
    let addr = spawn_voiceprint_server().await;
    let client = client_for(addr, "not-the-secret");

    let err = client
        .voiceprint()
        .search_score_fea("group_fzm", "alice", b"mp3")
        .await
        .unwrap_err();
    assert!(err.is_auth_error(), "unexpected error: {err}");
    match err {
        Error::Auth { http_status, message } => {
            assert_eq!(http_status, 401);
            assert_eq!(message, "HMAC signature cannot be verified");
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

// ================== Dictation ==================

fn iat_reply(status: i32, words: &[&str]) -> String {
    let ws: Vec<Value> = words.iter().map(|w| json!({"cw": [{"w": w}]})).collect();
    json!({
        "code": 0,
        "message": "success",
        "sid": "iat000",
        "data": {"status": status, "result": {"sn": 1, "ls": status == 2, "ws": ws}}
    })
    .to_string()
}

#[tokio::test]
async fn test_iat_transcribe() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut query = String::new();
        let mut ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                query = req.uri().query().unwrap_or_default().to_string();
                Ok(resp)
            },
        )
        .await
        .unwrap();

        let mut frames = Vec::new();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let v: Value = serde_json::from_str(text.as_str()).unwrap();
                let status = v["data"]["status"].as_i64().unwrap();
                frames.push(v);
                if status == 0 {
                    ws.send(Message::Text(iat_reply(1, &["open", " "]).into()))
                        .await
                        .unwrap();
                }
                if status == 2 {
                    ws.send(Message::Text(iat_reply(2, &["sesame"]).into()))
                        .await
                        .unwrap();
                    break;
                }
            }
        }
        (query, frames)
    });

    let client = client_for(addr, API_SECRET);
    let req = IatRequest {
        frame_interval: Duration::ZERO,
        ..IatRequest::new(Language::EnUs)
    };
    let pcm = vec![0u8; 3000];
    let text = client.iat().transcribe(&pcm, &req).await.unwrap();
    assert_eq!(text, "open sesame");

    let (query, frames) = server.await.unwrap();
    assert!(query.contains("authorization="));
    assert!(query.contains("date="));
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0]["common"]["app_id"], APP_ID);
    assert_eq!(frames[0]["business"]["language"], "en_us");
}

#[tokio::test]
async fn test_iat_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Swallow frames, never answer.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = Client::builder(APP_ID)
        .api_key(API_KEY)
        .api_secret(API_SECRET)
        .iat_url(format!("ws://{}/v2/iat", addr))
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let req = IatRequest {
        frame_interval: Duration::ZERO,
        ..IatRequest::default()
    };
    let err = client.iat().transcribe(&[0u8; 2560], &req).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err}");
}
