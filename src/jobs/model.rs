//! Job, chapter and snippet types.

use crate::error::{ChapsplitError, FailureKind, Result};
use crate::source::{ResolvedSource, SourceIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named time range within the source media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start_seconds: f64, end_seconds: f64) -> Self {
        Self {
            title: title.into(),
            start_seconds,
            end_seconds,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Check the bounds and return the clip duration.
    pub fn validate(&self, index: usize) -> Result<f64> {
        let duration = self.duration();
        let bounds_ok = self.start_seconds.is_finite()
            && self.end_seconds.is_finite()
            && self.start_seconds >= 0.0
            && duration > 0.0;

        if bounds_ok {
            Ok(duration)
        } else {
            Err(ChapsplitError::InvalidChapter {
                index,
                title: self.title.clone(),
                start: self.start_seconds,
                end: self.end_seconds,
            })
        }
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Fetching,
    Transcoding,
    Splitting,
    Ready,
    Failed,
}

impl JobStatus {
    /// Ready or Failed.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Fetching => "fetching",
            JobStatus::Transcoding => "transcoding",
            JobStatus::Splitting => "splitting",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Why a job (or one snippet) failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&ChapsplitError> for JobFailure {
    fn from(err: &ChapsplitError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

/// State of one chapter's clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnippetState {
    Pending,
    Ready,
    Failed { kind: FailureKind, message: String },
}

impl SnippetState {
    pub fn failed(err: &ChapsplitError) -> Self {
        SnippetState::Failed {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SnippetState::Ready)
    }
}

/// The materialized audio clip of one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Position of the chapter, zero-based.
    pub index: usize,
    pub title: String,
    pub file_name: String,
    pub chapter: Chapter,
    #[serde(flatten)]
    pub state: SnippetState,
}

/// Per-source pipeline state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub identity: SourceIdentity,
    pub source_url: String,
    pub title: Option<String>,
    pub chapters: Vec<Chapter>,
    pub status: JobStatus,
    pub snippets: Vec<Snippet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    pub output_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(source: &ResolvedSource, output_dir: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            identity: source.identity.clone(),
            source_url: source.url.clone(),
            title: None,
            chapters: Vec::new(),
            status: JobStatus::Pending,
            snippets: Vec::new(),
            failure: None,
            output_dir,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Reset for a new attempt.
    pub fn restart(&mut self) {
        self.failure = None;
        self.set_status(JobStatus::Pending);
    }

    pub fn fail(&mut self, failure: JobFailure) {
        self.failure = Some(failure);
        self.set_status(JobStatus::Failed);
    }

    pub fn ready_count(&self) -> usize {
        self.snippets.iter().filter(|s| s.state.is_ready()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.snippets
            .iter()
            .filter(|s| matches!(s.state, SnippetState::Failed { .. }))
            .count()
    }

    /// Put the given clips back to Pending after they vanished from storage.
    pub fn clips_missing(&mut self, indices: &[usize]) {
        for snippet in &mut self.snippets {
            if indices.contains(&snippet.index) {
                snippet.state = SnippetState::Pending;
            }
        }
        self.fail(JobFailure::new(
            FailureKind::Internal,
            format!(
                "{} clips missing from storage; submit again to rebuild",
                indices.len()
            ),
        ));
    }

    /// Whether a new submission should leave this job alone.
    pub fn is_settled(&self) -> bool {
        match self.status {
            JobStatus::Ready => true,
            JobStatus::Failed => self
                .failure
                .as_ref()
                .is_some_and(|f| !f.kind.is_retryable()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;

    fn sample_job() -> Job {
        let source = ResolvedSource {
            identity: SourceIdentity::new("xETEYG-az9E").unwrap(),
            url: "https://www.youtube.com/watch?v=xETEYG-az9E".into(),
            kind: SourceKind::YouTube,
        };
        Job::new(&source, PathBuf::from("/tmp/jobs/xETEYG-az9E"))
    }

    #[test]
    fn test_chapter_validation() {
        assert_eq!(Chapter::new("Intro", 0.0, 30.0).validate(0).unwrap(), 30.0);
        assert!(Chapter::new("Zero", 30.0, 30.0).validate(1).is_err());
        assert!(Chapter::new("Backwards", 40.0, 30.0).validate(2).is_err());
        assert!(Chapter::new("Negative", -5.0, 30.0).validate(3).is_err());
        assert!(Chapter::new("Nan", 0.0, f64::NAN).validate(4).is_err());
    }

    #[test]
    fn test_invalid_chapter_error_kind() {
        let err = Chapter::new("Broken", 10.0, 5.0).validate(7).unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidChapter);
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_status_terminality() {
        assert!(JobStatus::Ready.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Splitting.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_settled_jobs() {
        let mut job = sample_job();
        assert!(!job.is_settled());

        job.fail(JobFailure::new(FailureKind::Fetch, "network down"));
        assert!(!job.is_settled());

        job.fail(JobFailure::new(FailureKind::NoChapters, "no chapters"));
        assert!(job.is_settled());

        job.restart();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.failure.is_none());
    }

    #[test]
    fn test_missing_clips_unsettle_ready_job() {
        let mut job = sample_job();
        job.snippets = ["01-intro.mp3", "02-main.mp3"]
            .iter()
            .enumerate()
            .map(|(index, file)| Snippet {
                index,
                title: file.to_string(),
                file_name: file.to_string(),
                chapter: Chapter::new("x", 0.0, 1.0),
                state: SnippetState::Ready,
            })
            .collect();
        job.set_status(JobStatus::Ready);
        assert!(job.is_settled());

        job.clips_missing(&[1]);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.ready_count(), 1);
        assert_eq!(job.snippets[1].state, SnippetState::Pending);
        assert!(!job.is_settled());
    }

    #[test]
    fn test_snippet_serializes_flat_state() {
        let snippet = Snippet {
            index: 0,
            title: "Intro".into(),
            file_name: "01-intro.mp3".into(),
            chapter: Chapter::new("Intro", 0.0, 30.0),
            state: SnippetState::Ready,
        };
        let json = serde_json::to_value(&snippet).unwrap();
        assert_eq!(json["state"], "ready");
        assert_eq!(json["file_name"], "01-intro.mp3");
    }
}
