//! Settings resolution.
//!
//! Every setting comes from, in order of precedence: a command-line flag,
//! an environment variable, the YAML config file, the built-in default.
//! Flags and environment variables are merged by clap.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{Cli, ServeArgs};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_GROUP: &str = "group_fzm";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ENCODER_TIMEOUT_SECS: u64 = 20;

/// Contents of the YAML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub group: Option<String>,
    pub threshold: Option<f64>,
    pub port: Option<u16>,
    /// Transcribe and check the phrase when the request carries one.
    pub speech_gate: Option<bool>,
    /// MP3 encoder program (ffmpeg-compatible).
    pub encoder: Option<String>,
    pub encoder_timeout_secs: Option<u64>,
    /// Directory to keep a copy of every upload in.
    pub audio_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub voiceprint_url: Option<String>,
    pub iat_url: Option<String>,
}

impl FileConfig {
    /// Loads the file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Loads the file named by `--config`, or returns an empty config.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        match &cli.config {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Credentials and endpoints for the iFlytek client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub app_id: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
    pub voiceprint_url: Option<String>,
    pub iat_url: Option<String>,
}

impl ClientSettings {
    pub fn resolve(cli: &Cli, file: &FileConfig) -> anyhow::Result<Self> {
        Ok(Self {
            app_id: required(cli.app_id.as_ref(), file.app_id.as_ref(), "app id", "XFYUN_APP_ID")?,
            api_key: required(
                cli.api_key.as_ref(),
                file.api_key.as_ref(),
                "api key",
                "XFYUN_API_KEY",
            )?,
            api_secret: required(
                cli.api_secret.as_ref(),
                file.api_secret.as_ref(),
                "api secret",
                "XFYUN_API_SECRET",
            )?,
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            voiceprint_url: file.voiceprint_url.clone(),
            iat_url: file.iat_url.clone(),
        })
    }

    /// Builds the iFlytek client.
    pub fn client(&self) -> anyhow::Result<voxgate_xfyun::Client> {
        let mut builder = voxgate_xfyun::Client::builder(&self.app_id)
            .api_key(&self.api_key)
            .api_secret(&self.api_secret)
            .timeout(self.timeout);
        if let Some(url) = &self.voiceprint_url {
            builder = builder.voiceprint_url(url);
        }
        if let Some(url) = &self.iat_url {
            builder = builder.iat_url(url);
        }
        Ok(builder.build()?)
    }
}

/// Group id shared by the server and the admin commands.
pub fn resolve_group(cli: &Cli, file: &FileConfig) -> String {
    cli.group
        .clone()
        .or_else(|| file.group.clone())
        .unwrap_or_else(|| DEFAULT_GROUP.to_string())
}

/// Settings of the check-in server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeSettings {
    pub port: u16,
    pub group: String,
    pub threshold: f64,
    pub speech_gate: bool,
    pub encoder: String,
    pub encoder_timeout: Duration,
    pub audio_dir: Option<PathBuf>,
}

impl ServeSettings {
    pub fn resolve(cli: &Cli, args: &ServeArgs, file: &FileConfig) -> anyhow::Result<Self> {
        let threshold = args
            .score
            .or(file.threshold)
            .unwrap_or(voxgate_checkin::DEFAULT_THRESHOLD);
        if !threshold.is_finite() {
            anyhow::bail!("score threshold must be a finite number");
        }
        Ok(Self {
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            group: resolve_group(cli, file),
            threshold,
            speech_gate: !args.no_speech_gate && file.speech_gate.unwrap_or(true),
            encoder: args
                .encoder
                .clone()
                .or_else(|| file.encoder.clone())
                .unwrap_or_else(|| voxgate_audio::DEFAULT_ENCODER_PROGRAM.to_string()),
            encoder_timeout: Duration::from_secs(
                file.encoder_timeout_secs
                    .unwrap_or(DEFAULT_ENCODER_TIMEOUT_SECS),
            ),
            audio_dir: args.audio_dir.clone().or_else(|| file.audio_dir.clone()),
        })
    }
}

fn required(
    flag: Option<&String>,
    file: Option<&String>,
    what: &str,
    env: &str,
) -> anyhow::Result<String> {
    flag.or(file)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "missing {}: set ${} or add it to the config file",
                what,
                env
            )
        })
}
