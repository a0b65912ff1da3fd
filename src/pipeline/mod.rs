//! The media pipeline: Fetch → Transcode → Split.
//!
//! Each stage reads the previous stage's artifact from disk and skips itself
//! when its own artifact is already complete, so any run can resume where
//! an earlier one stopped. Stages return `Result`s to the orchestrator,
//! which owns the job state machine.

mod fetch;
mod reporter;
mod split;
mod transcode;

pub use reporter::{NoopReporter, PipelineReporter, TracingReporter};

use crate::config::Settings;
use crate::error::{ChapsplitError, Result};
use crate::jobs::{JobLayout, JobManifest, JobStore};
use crate::media::{MediaEncoder, MediaFetcher};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Which stages have work left for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub download: bool,
    pub transcode: bool,
    pub split: bool,
}

/// Stage runner shared by all jobs.
pub struct Pipeline {
    fetcher: Arc<dyn MediaFetcher>,
    encoder: Arc<dyn MediaEncoder>,
    reporter: Arc<dyn PipelineReporter>,
    store: JobStore,
    processes: Semaphore,
    max_concurrent_splits: usize,
    verify_durations: bool,
    duration_tolerance: f64,
}

impl Pipeline {
    pub fn new(
        settings: &Settings,
        fetcher: Arc<dyn MediaFetcher>,
        encoder: Arc<dyn MediaEncoder>,
        reporter: Arc<dyn PipelineReporter>,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            reporter,
            store: JobStore::from_settings(settings),
            processes: Semaphore::new(settings.pipeline.process_limit()),
            max_concurrent_splits: settings.pipeline.max_concurrent_splits.max(1),
            verify_durations: settings.encode.verify_durations,
            duration_tolerance: settings.encode.duration_tolerance_seconds,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn reporter(&self) -> &Arc<dyn PipelineReporter> {
        &self.reporter
    }

    /// Slot in the global external-process pool.
    async fn process_permit(&self) -> Result<SemaphorePermit<'_>> {
        self.processes
            .acquire()
            .await
            .map_err(|_| ChapsplitError::Config("process pool closed".into()))
    }

    /// Work out which stages still have output to produce.
    ///
    /// Upstream artifacts are only needed for downstream outputs that are
    /// missing: with every clip present neither the audio track nor the raw
    /// media is required.
    pub fn plan(&self, layout: &JobLayout, manifest: &JobManifest) -> StagePlan {
        let split = manifest.entries().any(|(i, chapter, file)| {
            chapter.validate(i).is_ok() && !layout.is_complete(&layout.snippet_path(file))
        });
        let transcode = split && !layout.is_complete(&layout.audio_path());
        let download = transcode && !layout.is_complete(&layout.source_path());

        StagePlan {
            download,
            transcode,
            split,
        }
    }
}
