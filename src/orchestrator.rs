//! Job orchestrator for chapsplit.
//!
//! Owns the job table and drives each job through Fetch → Transcode → Split.
//! There is at most one live run per source identity: a submission for a job
//! that is running, Ready, or failed for good attaches to it instead of
//! starting anything.

use crate::archive::ArchiveBuilder;
use crate::config::Settings;
use crate::error::{FailureKind, Result};
use crate::jobs::{
    self, Job, JobFailure, JobLayout, JobManifest, JobStatus, NoChaptersRecord, Snippet,
    SnippetState,
};
use crate::media::{FfmpegEncoder, MediaEncoder, MediaFetcher, YtDlpFetcher};
use crate::pipeline::{Pipeline, PipelineReporter, TracingReporter};
use crate::registry::{SnippetEntry, SnippetRegistry};
use crate::source::{self, ResolvedSource, SourceIdentity, SourceKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// The main orchestrator for the chapsplit pipeline.
pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    registry: Arc<SnippetRegistry>,
    archive: ArchiveBuilder,
    jobs: Mutex<HashMap<SourceIdentity, Arc<JobSlot>>>,
    job_permits: Arc<Semaphore>,
}

struct SlotState {
    job: Job,
    running: bool,
}

/// Shared state of one source identity.
struct JobSlot {
    state: RwLock<SlotState>,
    /// Held for the whole of a run.
    run_lock: Mutex<()>,
    status_tx: watch::Sender<JobStatus>,
}

impl JobSlot {
    fn new(job: Job) -> Self {
        let (status_tx, _) = watch::channel(job.status);
        Self {
            state: RwLock::new(SlotState {
                job,
                running: false,
            }),
            run_lock: Mutex::new(()),
            status_tx,
        }
    }

    async fn update(&self, f: impl FnOnce(&mut Job)) {
        let mut state = self.state.write().await;
        f(&mut state.job);
        self.status_tx.send_replace(state.job.status);
    }

    async fn set_status(&self, status: JobStatus) {
        self.update(|job| job.set_status(status)).await;
    }
}

/// A submitted job. Cheap to clone; every clone observes the same job.
#[derive(Clone)]
pub struct JobHandle {
    identity: SourceIdentity,
    slot: Arc<JobSlot>,
    status_rx: watch::Receiver<JobStatus>,
}

impl JobHandle {
    fn new(identity: SourceIdentity, slot: Arc<JobSlot>) -> Self {
        let status_rx = slot.status_tx.subscribe();
        Self {
            identity,
            slot,
            status_rx,
        }
    }

    pub fn identity(&self) -> &SourceIdentity {
        &self.identity
    }

    /// Latest status.
    pub fn status(&self) -> JobStatus {
        *self.status_rx.borrow()
    }

    /// Snapshot of the job.
    pub async fn snapshot(&self) -> Job {
        self.slot.state.read().await.job.clone()
    }

    /// Wait until the job is Ready or Failed.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status_rx.clone();
        let result = rx.wait_for(|status| status.is_terminal()).await.map(|s| *s);
        match result {
            Ok(status) => status,
            // sender lives in the slot, which this handle keeps alive
            Err(_) => *rx.borrow(),
        }
    }
}

impl Orchestrator {
    /// Create an orchestrator that shells out to the configured tools.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_reporter(settings, Arc::new(TracingReporter))
    }

    /// Create an orchestrator with a custom progress reporter.
    pub fn with_reporter(settings: Settings, reporter: Arc<dyn PipelineReporter>) -> Result<Self> {
        let fetcher = Arc::new(YtDlpFetcher::new(&settings.fetch));
        let encoder = Arc::new(FfmpegEncoder::new(&settings.encode));
        Self::with_components(settings, fetcher, encoder, reporter)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        fetcher: Arc<dyn MediaFetcher>,
        encoder: Arc<dyn MediaEncoder>,
        reporter: Arc<dyn PipelineReporter>,
    ) -> Result<Self> {
        settings.validate()?;
        std::fs::create_dir_all(settings.job_root())?;

        let pipeline = Arc::new(Pipeline::new(&settings, fetcher, encoder, reporter));
        let registry = Arc::new(SnippetRegistry::new(
            pipeline.store().clone(),
            &settings.server.public_url,
        ));
        let archive = ArchiveBuilder::new(registry.clone());
        let job_permits = Arc::new(Semaphore::new(settings.pipeline.max_concurrent_jobs));

        Ok(Self {
            pipeline,
            registry,
            archive,
            jobs: Mutex::new(HashMap::new()),
            job_permits,
        })
    }

    /// Submit a URL for processing.
    ///
    /// Returns immediately. The handle observes the run this call started,
    /// or the existing job if there was nothing to start.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn submit(&self, input: &str) -> Result<JobHandle> {
        let source = source::resolve(input)?;
        let slot = self.slot_for(&source).await;
        self.reverify(&slot).await?;

        let start = {
            let mut state = slot.state.write().await;
            if state.running || state.job.is_settled() {
                debug!("Attaching to {} job {}", state.job.status, source.identity);
                false
            } else {
                state.job.restart();
                state.running = true;
                slot.status_tx.send_replace(state.job.status);
                true
            }
        };

        let handle = JobHandle::new(source.identity.clone(), slot.clone());
        if start {
            info!("Queued {}", source.identity);
            tokio::spawn(Self::drive(
                self.pipeline.clone(),
                slot,
                source,
                self.job_permits.clone(),
            ));
        }

        Ok(handle)
    }

    async fn slot_for(&self, source: &ResolvedSource) -> Arc<JobSlot> {
        let mut jobs = self.jobs.lock().await;
        jobs.entry(source.identity.clone())
            .or_insert_with(|| {
                let layout = self.pipeline.store().layout(&source.identity);
                Arc::new(JobSlot::new(Job::new(source, layout.dir().to_path_buf())))
            })
            .clone()
    }

    /// Check a Ready job's clips against storage. Clips deleted since the run
    /// go back to Pending and the job fails, so the next submission rebuilds
    /// them.
    async fn reverify(&self, slot: &JobSlot) -> Result<()> {
        let (layout, clips) = {
            let state = slot.state.read().await;
            if state.running || state.job.status != JobStatus::Ready {
                return Ok(());
            }
            let layout = self.pipeline.store().layout(&state.job.identity);
            let clips: Vec<(usize, PathBuf)> = state
                .job
                .snippets
                .iter()
                .filter(|s| s.state.is_ready())
                .map(|s| (s.index, layout.snippet_path(&s.file_name)))
                .collect();
            (layout, clips)
        };

        let missing = jobs::blocking(move || {
            Ok(clips
                .into_iter()
                .filter(|(_, path)| !layout.is_complete(path))
                .map(|(index, _)| index)
                .collect::<Vec<_>>())
        })
        .await?;
        if missing.is_empty() {
            return Ok(());
        }

        let mut state = slot.state.write().await;
        if !state.running && state.job.status == JobStatus::Ready {
            warn!(
                "{} clips of {} are gone from storage",
                missing.len(),
                state.job.identity
            );
            state.job.clips_missing(&missing);
            slot.status_tx.send_replace(state.job.status);
        }
        Ok(())
    }

    /// Run one job to a terminal status.
    async fn drive(
        pipeline: Arc<Pipeline>,
        slot: Arc<JobSlot>,
        source: ResolvedSource,
        job_permits: Arc<Semaphore>,
    ) {
        let span = info_span!("job", identity = %source.identity, run = %Uuid::new_v4());

        async move {
            // the semaphore is never closed
            let _permit = job_permits.acquire_owned().await.ok();
            let _exclusive = slot.run_lock.lock().await;

            let stages = tokio::spawn(
                Self::run_stages(pipeline.clone(), slot.clone(), source.clone()).in_current_span(),
            );
            let outcome = match stages.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(JobFailure::from(&e)),
                Err(e) => {
                    error!("Pipeline task died: {}", e);
                    Some(JobFailure::new(
                        FailureKind::Internal,
                        format!("pipeline task died: {}", e),
                    ))
                }
            };

            let (status, failure) = {
                let mut state = slot.state.write().await;
                match outcome {
                    Some(failure) => state.job.fail(failure),
                    None if state.job.ready_count() == 0 => {
                        let total = state.job.snippets.len();
                        state.job.fail(JobFailure::new(
                            FailureKind::Split,
                            format!("none of {} chapters could be split", total),
                        ));
                    }
                    None => state.job.set_status(JobStatus::Ready),
                }
                state.running = false;
                slot.status_tx.send_replace(state.job.status);
                (state.job.status, state.job.failure.clone())
            };

            pipeline
                .reporter()
                .job_finished(&source.identity, status, failure.as_ref());
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        pipeline: Arc<Pipeline>,
        slot: Arc<JobSlot>,
        source: ResolvedSource,
    ) -> Result<()> {
        let identity = &source.identity;
        let reporter = pipeline.reporter().clone();
        let layout = pipeline.store().layout(identity);
        {
            let layout = layout.clone();
            jobs::blocking(move || layout.sweep_staging()).await?;
        }

        slot.set_status(JobStatus::Fetching).await;
        reporter.stage_started(identity, JobStatus::Fetching);
        let manifest = pipeline.fetch_metadata(&source, &layout).await?;

        slot.update(|job| {
            job.title = Some(manifest.title.clone());
            job.chapters = manifest.chapters.clone();
            job.snippets = pending_snippets(&manifest);
        })
        .await;
        reporter.chapters_known(identity, &manifest.title, manifest.chapters.len());

        let plan = pipeline.plan(&layout, &manifest);
        debug!("{:?}", plan);

        if plan.download {
            pipeline.fetch_media(&source, &layout).await?;
        } else {
            reporter.stage_skipped(identity, JobStatus::Fetching, "raw media not needed");
        }

        slot.set_status(JobStatus::Transcoding).await;
        reporter.stage_started(identity, JobStatus::Transcoding);
        if plan.transcode {
            pipeline.transcode(identity, &layout).await?;
        } else {
            reporter.stage_skipped(identity, JobStatus::Transcoding, "audio track not needed");
        }

        slot.set_status(JobStatus::Splitting).await;
        reporter.stage_started(identity, JobStatus::Splitting);
        let snippets = pipeline.split(&layout, &manifest).await?;
        slot.update(|job| job.snippets = snippets).await;

        Ok(())
    }

    /// Current job for a URL, from memory or reconstructed from storage.
    pub async fn job(&self, input: &str) -> Result<Option<Job>> {
        let source = source::resolve(input)?;

        let slot = self.jobs.lock().await.get(&source.identity).cloned();
        if let Some(slot) = slot {
            self.reverify(&slot).await?;
            return Ok(Some(slot.state.read().await.job.clone()));
        }

        let layout = self.pipeline.store().layout(&source.identity);
        jobs::blocking(move || stored_job(&layout)).await
    }

    /// Status of the job for a URL; `None` if it was never submitted.
    pub async fn status(&self, input: &str) -> Result<Option<JobStatus>> {
        Ok(self.job(input).await?.map(|job| job.status))
    }

    /// Ready clips for a URL.
    pub async fn snippets(&self, input: &str) -> Result<Vec<SnippetEntry>> {
        let registry = self.registry.clone();
        let input = input.to_string();
        jobs::blocking(move || registry.list_url(&input)).await
    }

    /// Zip of the ready clips for a URL.
    pub async fn archive(&self, input: &str) -> Result<Vec<u8>> {
        let source = source::resolve(input)?;
        self.archive.build(&source.identity).await
    }

    /// Every job known to this process or present in the job root.
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let slots: Vec<Arc<JobSlot>> = self.jobs.lock().await.values().cloned().collect();
        let mut known: HashMap<SourceIdentity, Job> = HashMap::new();
        for slot in slots {
            self.reverify(&slot).await?;
            let job = slot.state.read().await.job.clone();
            known.insert(job.identity.clone(), job);
        }

        let store = self.pipeline.store().clone();
        let mut jobs = jobs::blocking(move || {
            let entries = match std::fs::read_dir(store.root()) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(known),
                Err(e) => return Err(e.into()),
            };
            for entry in entries.flatten() {
                let Ok(identity) = SourceIdentity::new(entry.file_name().to_string_lossy()) else {
                    continue;
                };
                if known.contains_key(&identity) {
                    continue;
                }
                if let Some(job) = stored_job(&store.layout(&identity))? {
                    known.insert(identity, job);
                }
            }
            Ok(known)
        })
        .await?
        .into_values()
        .collect::<Vec<_>>();

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }
}

fn pending_snippets(manifest: &JobManifest) -> Vec<Snippet> {
    manifest
        .entries()
        .map(|(index, chapter, file_name)| Snippet {
            index,
            title: chapter.title.clone(),
            file_name: file_name.to_string(),
            chapter: chapter.clone(),
            state: SnippetState::Pending,
        })
        .collect()
}

/// Rebuild a job from what an earlier process left in storage.
fn stored_job(layout: &JobLayout) -> Result<Option<Job>> {
    if let Some(manifest) = JobManifest::load(layout)? {
        let source = stored_source(&manifest.identity, &manifest.source_url);
        return Ok(Some(job_from_manifest(&source, layout, manifest)));
    }

    if let Some(record) = NoChaptersRecord::load(layout)? {
        let source = stored_source(&record.identity, &record.source_url);
        let mut job = Job::new(&source, layout.dir().to_path_buf());
        job.title = Some(record.title.clone());
        job.created_at = record.checked_at;
        job.fail(JobFailure::from(&record.error()));
        return Ok(Some(job));
    }

    Ok(None)
}

fn stored_source(identity: &SourceIdentity, url: &str) -> ResolvedSource {
    ResolvedSource {
        identity: identity.clone(),
        url: url.to_string(),
        kind: source::resolve(url)
            .map(|s| s.kind)
            .unwrap_or(SourceKind::Web),
    }
}

fn job_from_manifest(source: &ResolvedSource, layout: &JobLayout, manifest: JobManifest) -> Job {
    let mut job = Job::new(source, layout.dir().to_path_buf());
    job.title = Some(manifest.title.clone());
    job.chapters = manifest.chapters.clone();
    job.created_at = manifest.created_at;
    job.snippets = pending_snippets(&manifest)
        .into_iter()
        .map(|mut snippet| {
            snippet.state = match snippet.chapter.validate(snippet.index) {
                Err(e) => SnippetState::failed(&e),
                Ok(_) if layout.is_complete(&layout.snippet_path(&snippet.file_name)) => {
                    SnippetState::Ready
                }
                Ok(_) => SnippetState::Pending,
            };
            snippet
        })
        .collect();

    let pending = job
        .snippets
        .iter()
        .any(|s| matches!(s.state, SnippetState::Pending));
    if pending || job.ready_count() == 0 {
        job.fail(JobFailure::new(
            FailureKind::Internal,
            "previous run did not complete; submit again to resume",
        ));
    } else {
        job.set_status(JobStatus::Ready);
    }
    job
}
