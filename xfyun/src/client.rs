//! iFlytek open platform client.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::Signer,
    error::{Error, Result},
    http::HttpClient,
    iat::{IatService, DEFAULT_IAT_URL},
    voiceprint::{VoiceprintService, DEFAULT_VOICEPRINT_URL},
};

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// iFlytek open platform client.
///
/// # Example
///
/// ```rust,no_run
/// use voxgate_xfyun::Client;
///
/// # async fn run() -> voxgate_xfyun::Result<()> {
/// let client = Client::builder("your-app-id")
///     .api_key("your-api-key")
///     .api_secret("your-api-secret")
///     .build()?;
///
/// let features = client.voiceprint().query_feature_list("group_fzm").await?;
/// println!("{} enrolled", features.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient>,
}

impl Client {
    /// Creates a new client builder.
    pub fn builder(app_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(app_id)
    }

    /// Returns the configured app ID.
    pub fn app_id(&self) -> &str {
        self.http.app_id()
    }

    /// Returns the voiceprint group service.
    pub fn voiceprint(&self) -> VoiceprintService {
        VoiceprintService::new(self.http.clone())
    }

    /// Returns the dictation service.
    pub fn iat(&self) -> IatService {
        IatService::new(self.http.clone())
    }

    /// Returns a reference to the internal HTTP client.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }
}

/// Builder for creating an iFlytek client.
pub struct ClientBuilder {
    app_id: String,
    api_key: Option<String>,
    api_secret: Option<String>,
    voiceprint_url: String,
    iat_url: String,
    timeout: Duration,
}

impl ClientBuilder {
    /// Creates a new client builder.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: None,
            api_secret: None,
            voiceprint_url: DEFAULT_VOICEPRINT_URL.to_string(),
            iat_url: DEFAULT_IAT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the API secret used for HMAC signing.
    pub fn api_secret(mut self, api_secret: impl Into<String>) -> Self {
        self.api_secret = Some(api_secret.into());
        self
    }

    /// Sets a custom voiceprint endpoint.
    pub fn voiceprint_url(mut self, url: impl Into<String>) -> Self {
        self.voiceprint_url = url.into();
        self
    }

    /// Sets a custom dictation WebSocket endpoint.
    pub fn iat_url(mut self, url: impl Into<String>) -> Self {
        self.iat_url = url.into();
        self
    }

    /// Sets the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client> {
        if self.app_id.is_empty() {
            return Err(Error::Config("app_id must be non-empty".to_string()));
        }
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("api_key must be non-empty".to_string()))?;
        let api_secret = self
            .api_secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("api_secret must be non-empty".to_string()))?;

        let http = HttpClient::new(
            self.app_id,
            Signer::new(api_key, api_secret),
            self.voiceprint_url,
            self.iat_url,
            self.timeout,
        )?;

        Ok(Client {
            http: Arc::new(http),
        })
    }
}
