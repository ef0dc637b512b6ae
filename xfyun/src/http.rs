//! HTTP client implementation for the iFlytek open platform.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, HOST},
    Client as ReqwestClient, Response, StatusCode,
};
use serde::Serialize;
use tracing::debug;

use crate::auth::{Endpoint, Signer};
use crate::error::{Error, Result};

/// HTTP client shared by the services of one [`Client`](crate::Client).
pub struct HttpClient {
    client: ReqwestClient,
    signer: Signer,
    app_id: String,
    voiceprint_url: String,
    iat_url: String,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new(
        app_id: String,
        signer: Signer,
        voiceprint_url: String,
        iat_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            signer,
            app_id,
            voiceprint_url,
            iat_url,
            timeout,
        })
    }

    /// Returns the app ID.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Returns the request signer.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Returns the voiceprint endpoint URL.
    pub fn voiceprint_url(&self) -> &str {
        &self.voiceprint_url
    }

    /// Returns the dictation WebSocket URL.
    pub fn iat_url(&self) -> &str {
        &self.iat_url
    }

    /// Returns the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Signs `url` and POSTs `body` as JSON, returning the raw response body.
    ///
    /// Single attempt; retrying is left to the caller.
    pub async fn post_signed<T>(&self, url: &str, body: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let endpoint = Endpoint::parse(url)?;
        let signed = self.signer.sign_url(url, "POST")?;

        let response = self
            .client
            .post(&signed)
            .headers(self.headers(&endpoint.host)?)
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    fn headers(&self, host: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HOST,
            HeaderValue::from_str(host).map_err(|e| Error::Config(format!("host header: {}", e)))?,
        );
        headers.insert(
            "appid",
            HeaderValue::from_str(&self.app_id)
                .map_err(|e| Error::Config(format!("appid header: {}", e)))?,
        );
        Ok(headers)
    }

    async fn handle_response(&self, response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(status = status.as_u16(), len = body.len(), "xfyun response");

        match status {
            s if s.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth {
                http_status: status.as_u16(),
                message: gateway_message(&body),
            }),
            _ => Err(Error::api(
                status.as_u16() as i32,
                gateway_message(&body),
                status.as_u16(),
            )),
        }
    }
}

/// Gateway rejections come as `{"message": "..."}` rather than as an envelope.
fn gateway_message(body: &[u8]) -> String {
    #[derive(serde::Deserialize)]
    struct GatewayError {
        #[serde(default)]
        message: String,
    }

    match serde_json::from_slice::<GatewayError>(body) {
        Ok(e) if !e.message.is_empty() => e.message,
        _ => String::from_utf8_lossy(body).to_string(),
    }
}
