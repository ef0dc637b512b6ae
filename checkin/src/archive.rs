//! Optional on-disk copy of uploaded samples.

use std::path::{Path, PathBuf};

use tokio::fs;

/// Writes uploads to `{dir}/{address}_{unix}.wav`.
#[derive(Debug, Clone)]
pub struct AudioArchive {
    dir: PathBuf,
}

impl AudioArchive {
    /// Creates an archive rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the archive directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves one upload and returns its path.
    pub async fn save(
        &self,
        address: &str,
        timestamp: i64,
        wav: &[u8],
    ) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}_{}.wav", file_stem(address), timestamp));
        fs::write(&path, wav).await?;
        Ok(path)
    }
}

/// Keeps `[A-Za-z0-9_-]`, replaces anything else with `_`.
fn file_stem(address: &str) -> String {
    let stem: String = address
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "_".to_string() } else { stem }
}
