//! In-process stand-ins for yt-dlp and ffmpeg.

use crate::config::Settings;
use crate::error::{ChapsplitError, Result};
use crate::jobs::{Chapter, JobFailure, JobStatus, Snippet};
use crate::media::{MediaEncoder, MediaFetcher, SourceMetadata};
use crate::pipeline::PipelineReporter;
use crate::source::SourceIdentity;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Settings rooted in a temp directory, with small pools.
pub fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.general.data_dir = root.to_string_lossy().into_owned();
    settings.general.job_root = root.join("jobs").to_string_lossy().into_owned();
    settings.pipeline.max_concurrent_jobs = 2;
    settings.pipeline.max_concurrent_splits = 2;
    settings.pipeline.max_processes = 4;
    settings
}

pub fn three_chapters() -> Vec<Chapter> {
    vec![
        Chapter::new("Intro", 0.0, 30.0),
        Chapter::new("Main", 30.0, 300.0),
        Chapter::new("Outro", 300.0, 330.0),
    ]
}

/// Fetcher serving fixed metadata and writing a fake media file.
pub struct FakeFetcher {
    title: String,
    chapters: Vec<Chapter>,
    delay: Duration,
    fail_metadata: AtomicBool,
    fail_download: AtomicBool,
    pub metadata_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self {
            title: "Long Talk".into(),
            chapters,
            delay: Duration::ZERO,
            fail_metadata: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
            metadata_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch_metadata(&self, _url: &str) -> Result<SourceMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(ChapsplitError::Fetch("metadata unavailable".into()));
        }
        Ok(SourceMetadata {
            title: self.title.clone(),
            duration_seconds: self.chapters.last().map(|c| c.end_seconds),
            chapters: self.chapters.clone(),
        })
    }

    async fn download(&self, _url: &str, dest: &Path) -> Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.fail_download.load(Ordering::SeqCst) {
            return Err(ChapsplitError::Fetch("connection reset".into()));
        }
        std::fs::write(dest, b"video")?;
        Ok(())
    }
}

/// Encoder whose clips contain their own duration as text.
pub struct FakeEncoder {
    /// Trims starting here fail.
    fail_trim_at: Option<f64>,
    trim_delay: Duration,
    fail_extract: AtomicBool,
    trims_running: AtomicUsize,
    peak_trims: AtomicUsize,
    pub extract_calls: AtomicUsize,
    pub trim_calls: AtomicUsize,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self {
            fail_trim_at: None,
            trim_delay: Duration::ZERO,
            fail_extract: AtomicBool::new(false),
            trims_running: AtomicUsize::new(0),
            peak_trims: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            trim_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(start: f64) -> Self {
        Self {
            fail_trim_at: Some(start),
            ..Self::new()
        }
    }

    pub fn with_trim_delay(mut self, delay: Duration) -> Self {
        self.trim_delay = delay;
        self
    }

    /// Extraction writes a partial file, then fails.
    pub fn set_fail_extract(&self, fail: bool) {
        self.fail_extract.store(fail, Ordering::SeqCst);
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn trim_calls(&self) -> usize {
        self.trim_calls.load(Ordering::SeqCst)
    }

    /// Most trims ever running at the same time.
    pub fn peak_trims(&self) -> usize {
        self.peak_trims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<()> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        if !source.exists() {
            return Err(ChapsplitError::Encode("no input".into()));
        }
        if self.fail_extract.load(Ordering::SeqCst) {
            std::fs::write(dest, b"aud")?;
            return Err(ChapsplitError::Encode("stream ended early".into()));
        }
        std::fs::write(dest, b"audio")?;
        Ok(())
    }

    async fn trim(&self, _source: &Path, dest: &Path, start: f64, duration: f64) -> Result<()> {
        self.trim_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.trims_running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_trims.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.trim_delay).await;
        self.trims_running.fetch_sub(1, Ordering::SeqCst);

        if self.fail_trim_at == Some(start) {
            return Err(ChapsplitError::Encode(format!("corrupt frame at {}", start)));
        }
        std::fs::write(dest, duration.to_string())?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let text = std::fs::read_to_string(path)?;
        text.trim()
            .parse()
            .map_err(|_| ChapsplitError::Encode(format!("unreadable clip {:?}", path)))
    }
}

/// Reporter that keeps a log of events.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl PipelineReporter for RecordingReporter {
    fn stage_started(&self, _identity: &SourceIdentity, stage: JobStatus) {
        self.push(format!("started:{}", stage));
    }

    fn stage_skipped(&self, _identity: &SourceIdentity, stage: JobStatus, _reason: &str) {
        self.push(format!("skipped:{}", stage));
    }

    fn chapters_known(&self, _identity: &SourceIdentity, _title: &str, total: usize) {
        self.push(format!("chapters:{}", total));
    }

    fn chapter_finished(&self, _identity: &SourceIdentity, snippet: &Snippet, _total: usize) {
        self.push(format!("chapter:{}", snippet.index));
    }

    fn job_finished(&self, _identity: &SourceIdentity, status: JobStatus, _failure: Option<&JobFailure>) {
        self.push(format!("finished:{}", status));
    }
}
