//! Media acquisition via yt-dlp.
//!
//! The fetcher answers two questions about a source URL: what it is called
//! and where its chapters are, and what the raw media bytes are.

use super::process;
use crate::config::FetchSettings;
use crate::error::{ChapsplitError, Result};
use crate::jobs::Chapter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Title and chapter list of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub chapters: Vec<Chapter>,
}

/// Trait for media acquisition backends.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Query title and chapters without downloading.
    async fn fetch_metadata(&self, url: &str) -> Result<SourceMetadata>;

    /// Download the raw media to exactly `dest`.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// yt-dlp backed fetcher.
pub struct YtDlpFetcher {
    program: String,
    format: String,
    metadata_timeout: Duration,
    download_timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            program: settings.program.clone(),
            format: settings.format.clone(),
            metadata_timeout: settings.metadata_timeout(),
            download_timeout: settings.download_timeout(),
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    #[instrument(skip(self))]
    async fn fetch_metadata(&self, url: &str) -> Result<SourceMetadata> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--dump-single-json", "--no-playlist", "--no-warnings", url]);

        let output = process::run(cmd, &self.program, self.metadata_timeout)
            .await
            .map_err(|f| f.into_error(ChapsplitError::Fetch))?;

        let json_str = String::from_utf8_lossy(&output.stdout);
        let metadata = parse_metadata(&json_str)?;

        info!(
            "Found '{}' with {} chapters",
            metadata.title,
            metadata.chapters.len()
        );
        Ok(metadata)
    }

    #[instrument(skip(self, dest))]
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading media from {}", url);

        let mut cmd = Command::new(&self.program);
        cmd.arg("--format")
            .arg(&self.format)
            .arg("--output")
            .arg(dest)
            .arg("--no-playlist")
            .arg("--no-part")
            .arg("--force-overwrites")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url);

        process::run(cmd, &self.program, self.download_timeout)
            .await
            .map_err(|f| f.into_error(ChapsplitError::Fetch))?;

        let size = tokio::fs::metadata(dest).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(ChapsplitError::Fetch(format!(
                "{} reported success but wrote no media",
                self.program
            )));
        }

        debug!("Downloaded {} bytes", size);
        Ok(())
    }
}

#[derive(Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    duration: Option<f64>,
    chapters: Option<Vec<YtDlpChapter>>,
}

#[derive(Deserialize)]
struct YtDlpChapter {
    start_time: f64,
    end_time: f64,
    title: Option<String>,
}

/// Parse yt-dlp's `--dump-single-json` output.
pub fn parse_metadata(json: &str) -> Result<SourceMetadata> {
    let info: YtDlpInfo = serde_json::from_str(json)
        .map_err(|e| ChapsplitError::Fetch(format!("Failed to parse yt-dlp output: {}", e)))?;

    let chapters = info
        .chapters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let title = c
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Chapter {}", i + 1));
            Chapter::new(title.trim(), c.start_time, c.end_time)
        })
        .collect();

    Ok(SourceMetadata {
        title: info.title.unwrap_or_else(|| "Unknown Title".to_string()),
        duration_seconds: info.duration,
        chapters,
    })
}
