//! MP3 encoding through an external encoder process.
//!
//! The voiceprint engine only takes MP3 ("lame") audio. Encoding is
//! delegated to a child process that reads the original WAV on stdin and
//! writes mono 16 kHz MP3 to stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{AudioError, Result};

/// Default encoder program.
pub const DEFAULT_ENCODER_PROGRAM: &str = "ffmpeg";

/// Default bound on one encoder run.
pub const DEFAULT_ENCODER_TIMEOUT: Duration = Duration::from_secs(20);

/// Encodes a WAV stream to MP3.
#[async_trait]
pub trait Mp3Encoder: Send + Sync {
    /// Encodes `wav` to mono 16 kHz MP3.
    async fn encode(&self, wav: &[u8]) -> Result<Vec<u8>>;
}

/// Runs an external program as the encoder.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEncoder {
    /// Creates an encoder that runs `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_ENCODER_TIMEOUT,
        }
    }

    /// Creates an ffmpeg-compatible encoder running `program`.
    pub fn ffmpeg(program: impl Into<String>) -> Self {
        let args = [
            "-hide_banner", "-loglevel", "error", "-i", "pipe:0", "-ac", "1", "-ar", "16000",
            "-f", "mp3", "pipe:1",
        ];
        Self::new(program, args.iter().map(|s| s.to_string()).collect())
    }

    /// Sets the bound on one encoder run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program name.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self::ffmpeg(DEFAULT_ENCODER_PROGRAM)
    }
}

#[async_trait]
impl Mp3Encoder for CommandEncoder {
    async fn encode(&self, wav: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AudioError::Encoder(format!("spawn {}: {}", self.program, e)))?;

        // Feed stdin from its own task so a full stdout pipe cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AudioError::Encoder("encoder stdin unavailable".to_string()))?;
        let input = wav.to_vec();
        let writer = tokio::spawn(async move {
            // The encoder may exit before reading everything; its exit status tells.
            let _ = stdin.write_all(&input).await;
        });

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                writer.abort();
                return Err(AudioError::Timeout(self.timeout));
            }
        };
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::Encoder(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        if output.stdout.is_empty() {
            return Err(AudioError::Encoder(format!(
                "{} produced no output",
                self.program
            )));
        }

        debug!(
            program = %self.program,
            input = wav.len(),
            output = output.stdout.len(),
            "mp3 encoded"
        );
        Ok(output.stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandEncoder {
        CommandEncoder::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_ffmpeg_args() {
        let enc = CommandEncoder::default();
        assert_eq!(enc.program(), "ffmpeg");
        assert!(enc.args.windows(2).any(|w| w == ["-ar", "16000"]));
        assert!(enc.args.windows(2).any(|w| w == ["-ac", "1"]));
        assert!(enc.args.windows(2).any(|w| w == ["-f", "mp3"]));
    }

    #[tokio::test]
    async fn test_stdout_is_the_result() {
        let out = sh("cat").encode(b"RIFF-ish bytes").await.unwrap();
        assert_eq!(out, b"RIFF-ish bytes");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_encoder_error() {
        let err = sh("echo broken input >&2; exit 3")
            .encode(b"x")
            .await
            .unwrap_err();
        match err {
            AudioError::Encoder(msg) => assert!(msg.contains("broken input"), "{}", msg),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output_is_encoder_error() {
        let err = sh("cat > /dev/null").encode(b"x").await.unwrap_err();
        assert!(matches!(err, AudioError::Encoder(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_encoder_error() {
        let err = CommandEncoder::ffmpeg("/nonexistent/voxgate-encoder")
            .encode(b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, AudioError::Encoder(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = sh("sleep 5")
            .with_timeout(Duration::from_millis(100))
            .encode(b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, AudioError::Timeout(_)));
    }
}
