//! Request signing for the iFlytek open platform.
//!
//! Every endpoint, HTTP or WebSocket, authenticates with a pre-signed URL.
//! The signature covers the host, an RFC 1123 date and the request line:
//!
//! ```text
//! host: {host}
//! date: {date}
//! {method} {path} HTTP/1.1
//! ```
//!
//! The HMAC-SHA256 of that text is base64-encoded, wrapped into an
//! `api_key=..., algorithm=..., headers=..., signature=...` string, and the
//! wrapper is base64-encoded again and sent as the `authorization` query
//! parameter next to `date` and `host`. The gateway recomputes the signature;
//! any byte that differs ends in a 401 with no further detail.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm name placed in the authorization string.
pub const ALGORITHM: &str = "hmac-sha256";

/// Header list placed in the authorization string.
pub const SIGNED_HEADERS: &str = "host date request-line";

/// Host and path of an endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub path: String,
}

impl Endpoint {
    /// Splits `scheme://host[:port]/path` into host and path.
    ///
    /// The host keeps an explicit non-default port, the path keeps its
    /// leading slash. URLs without a host or without a path are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidUrl(raw.to_string());
        let url = url::Url::parse(raw).map_err(|_| invalid())?;
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        if url.path() == "/" || url.path().is_empty() {
            return Err(invalid());
        }
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            host,
            path: url.path().to_string(),
        })
    }
}

/// Formats a timestamp the way the gateway expects in the `date` parameter.
pub fn rfc1123_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds the text that gets signed.
pub fn signature_origin(host: &str, date: &str, method: &str, path: &str) -> String {
    format!("host: {}\ndate: {}\n{} {} HTTP/1.1", host, date, method, path)
}

/// Signs request URLs with an API key and secret.
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    api_secret: String,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

impl Signer {
    /// Creates a signer.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Returns the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns base64(HMAC-SHA256(secret, origin)).
    pub fn signature(&self, origin: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::Config(format!("api secret: {}", e)))?;
        mac.update(origin.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Returns the base64-encoded authorization string for a signature.
    pub fn authorization(&self, signature: &str) -> String {
        let origin = format!(
            r#"api_key="{}", algorithm="{}", headers="{}", signature="{}""#,
            self.api_key, ALGORITHM, SIGNED_HEADERS, signature
        );
        BASE64.encode(origin)
    }

    /// Signs `url` for `method` at the current time.
    pub fn sign_url(&self, url: &str, method: &str) -> Result<String> {
        self.sign_url_at(url, method, &rfc1123_date(Utc::now()))
    }

    /// Signs `url` for `method` with a fixed `date`.
    pub fn sign_url_at(&self, url: &str, method: &str, date: &str) -> Result<String> {
        let endpoint = Endpoint::parse(url)?;
        let origin = signature_origin(&endpoint.host, date, method, &endpoint.path);
        let authorization = self.authorization(&self.signature(&origin)?);

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("authorization", &authorization)
            .append_pair("date", date)
            .append_pair("host", &endpoint.host)
            .finish();

        Ok(format!("{}?{}", url, query))
    }
}
