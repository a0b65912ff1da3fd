//! Progress reporting hooks.
//!
//! The pipeline never prints; it tells an injected [`PipelineReporter`] what
//! happened. The server logs through [`TracingReporter`], the CLI draws
//! progress bars, tests record events.

use crate::jobs::{JobFailure, JobStatus, Snippet, SnippetState};
use crate::source::SourceIdentity;
use tracing::{info, warn};

/// Observer of pipeline progress. All methods default to no-ops.
pub trait PipelineReporter: Send + Sync {
    /// A stage began.
    fn stage_started(&self, _identity: &SourceIdentity, _stage: JobStatus) {}

    /// A stage's output already existed.
    fn stage_skipped(&self, _identity: &SourceIdentity, _stage: JobStatus, _reason: &str) {}

    /// Chapter list is known; `total` clips will be reported.
    fn chapters_known(&self, _identity: &SourceIdentity, _title: &str, _total: usize) {}

    /// One chapter's clip is done (ready, skipped or failed).
    fn chapter_finished(&self, _identity: &SourceIdentity, _snippet: &Snippet, _total: usize) {}

    /// The run ended in Ready or Failed.
    fn job_finished(
        &self,
        _identity: &SourceIdentity,
        _status: JobStatus,
        _failure: Option<&JobFailure>,
    ) {
    }
}

/// Reporter that discards everything.
pub struct NoopReporter;

impl PipelineReporter for NoopReporter {}

/// Reporter that logs through `tracing`.
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn stage_started(&self, identity: &SourceIdentity, stage: JobStatus) {
        info!(%identity, "Stage {} started", stage);
    }

    fn stage_skipped(&self, identity: &SourceIdentity, stage: JobStatus, reason: &str) {
        info!(%identity, "Stage {} skipped: {}", stage, reason);
    }

    fn chapters_known(&self, identity: &SourceIdentity, title: &str, total: usize) {
        info!(%identity, "'{}' has {} chapters", title, total);
    }

    fn chapter_finished(&self, identity: &SourceIdentity, snippet: &Snippet, total: usize) {
        match &snippet.state {
            SnippetState::Failed { kind, message } => warn!(
                %identity,
                "Chapter {}/{} '{}' failed ({}): {}",
                snippet.index + 1,
                total,
                snippet.title,
                kind,
                message
            ),
            _ => info!(
                %identity,
                "Chapter {}/{} '{}' -> {}",
                snippet.index + 1,
                total,
                snippet.title,
                snippet.file_name
            ),
        }
    }

    fn job_finished(&self, identity: &SourceIdentity, status: JobStatus, failure: Option<&JobFailure>) {
        match failure {
            Some(f) => warn!(%identity, "Job {} ({}): {}", status, f.kind, f.message),
            None => info!(%identity, "Job {}", status),
        }
    }
}
