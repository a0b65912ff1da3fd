//! Process command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{format_timestamp, Output};
use crate::config::Settings;
use crate::jobs::{JobFailure, JobStatus, Snippet, SnippetState};
use crate::orchestrator::Orchestrator;
use crate::pipeline::PipelineReporter;
use crate::source::SourceIdentity;
use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Draws pipeline progress on the terminal.
struct ConsoleReporter {
    bar: Mutex<Option<ProgressBar>>,
    chapters: AtomicU64,
}

impl ConsoleReporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            chapters: AtomicU64::new(0),
        }
    }

    fn replace(&self, bar: Option<ProgressBar>) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(old) = std::mem::replace(&mut *slot, bar) {
                old.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                f(bar);
            }
        }
    }
}

impl PipelineReporter for ConsoleReporter {
    fn stage_started(&self, _identity: &SourceIdentity, stage: JobStatus) {
        let bar = match stage {
            JobStatus::Fetching => Output::spinner("Fetching video..."),
            JobStatus::Transcoding => Output::spinner("Extracting audio..."),
            JobStatus::Splitting => Output::progress_bar(
                self.chapters.load(Ordering::Relaxed),
                "Splitting chapters",
            ),
            _ => return,
        };
        self.replace(Some(bar));
    }

    fn stage_skipped(&self, _identity: &SourceIdentity, stage: JobStatus, reason: &str) {
        self.with_bar(|bar| bar.println(format!("   {} skipped: {}", stage, reason)));
    }

    fn chapters_known(&self, _identity: &SourceIdentity, title: &str, total: usize) {
        self.chapters.store(total as u64, Ordering::Relaxed);
        self.with_bar(|bar| bar.println(format!("   '{}' has {} chapters", title, total)));
    }

    fn chapter_finished(&self, _identity: &SourceIdentity, snippet: &Snippet, _total: usize) {
        self.with_bar(|bar| {
            if let SnippetState::Failed { message, .. } = &snippet.state {
                bar.println(format!("   '{}' failed: {}", snippet.title, message));
            }
            bar.inc(1);
        });
    }

    fn job_finished(&self, _identity: &SourceIdentity, _status: JobStatus, _failure: Option<&JobFailure>) {
        self.replace(None);
    }
}

/// Run the process command.
pub async fn run_process(url: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Process, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'chapsplit doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    Output::info(&format!("Processing: {}", url));

    let orchestrator = Orchestrator::with_reporter(settings, Arc::new(ConsoleReporter::new()))?;
    let handle = orchestrator.submit(url).await?;

    let status = handle.wait().await;
    let job = handle.snapshot().await;
    let title = job.title.clone().unwrap_or_else(|| job.identity.to_string());

    match status {
        JobStatus::Ready => {
            Output::success(&format!(
                "'{}': {} of {} clips ready",
                title,
                job.ready_count(),
                job.snippets.len()
            ));
            for snippet in job.snippets.iter().filter(|s| s.state.is_ready()) {
                Output::list_item(&format!(
                    "{} [{}]",
                    job.output_dir.join("snippets").join(&snippet.file_name).display(),
                    format_timestamp(snippet.chapter.duration())
                ));
            }
            if job.failed_count() > 0 {
                Output::warning(&format!(
                    "{} chapter(s) failed; run the command again to retry them",
                    job.failed_count()
                ));
            }
            Ok(())
        }
        _ => {
            let reason = job
                .failure
                .map(|f| format!("{}: {}", f.kind, f.message))
                .unwrap_or_else(|| "unknown error".to_string());
            Output::error(&format!("Failed to process '{}': {}", title, reason));
            Err(anyhow::anyhow!("processing failed: {}", reason))
        }
    }
}
