//! Error types for chapsplit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Library-level error type for chapsplit operations.
#[derive(Error, Debug)]
pub enum ChapsplitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Source {0} has no chapter markers")]
    NoChapters(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Invalid chapter #{index} '{title}': start {start}s, end {end}s")]
    InvalidChapter {
        index: usize,
        title: String,
        start: f64,
        end: f64,
    },

    #[error("Split failed: {0}")]
    Split(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl ChapsplitError {
    /// Classification recorded on a failed job or snippet.
    pub fn kind(&self) -> FailureKind {
        match self {
            ChapsplitError::Fetch(_) => FailureKind::Fetch,
            ChapsplitError::NoChapters(_) => FailureKind::NoChapters,
            ChapsplitError::Encode(_) => FailureKind::Encode,
            ChapsplitError::InvalidChapter { .. } => FailureKind::InvalidChapter,
            ChapsplitError::Split(_) => FailureKind::Split,
            ChapsplitError::ToolNotFound(_) => FailureKind::ToolNotFound,
            ChapsplitError::InvalidInput(_) => FailureKind::InvalidInput,
            _ => FailureKind::Internal,
        }
    }
}

/// Serializable failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    NoChapters,
    Encode,
    InvalidChapter,
    Split,
    ToolNotFound,
    InvalidInput,
    Internal,
}

impl FailureKind {
    /// Whether re-submitting the same source can succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            FailureKind::NoChapters | FailureKind::InvalidChapter | FailureKind::InvalidInput
        )
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Fetch => "fetch",
            FailureKind::NoChapters => "no_chapters",
            FailureKind::Encode => "encode",
            FailureKind::InvalidChapter => "invalid_chapter",
            FailureKind::Split => "split",
            FailureKind::ToolNotFound => "tool_not_found",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}

/// Result type alias for chapsplit operations.
pub type Result<T> = std::result::Result<T, ChapsplitError>;
