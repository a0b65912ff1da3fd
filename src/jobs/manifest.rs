//! Persisted job metadata (`job.json`).
//!
//! The manifest is the Fetch stage's first artifact: it pins the title, the
//! chapter list and the snippet file names, so later runs and read-side
//! queries never need to ask the source again. A source that turned out to
//! have no chapters gets a [`NoChaptersRecord`] instead, which is just as
//! final.

use super::layout::JobLayout;
use super::naming::snippet_file_names;
use super::Chapter;
use crate::error::{ChapsplitError, Result};
use crate::media::SourceMetadata;
use crate::source::{ResolvedSource, SourceIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    pub identity: SourceIdentity,
    pub source_url: String,
    pub title: String,
    pub duration_seconds: Option<f64>,
    pub chapters: Vec<Chapter>,
    /// One entry per chapter, same order.
    pub snippet_files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl JobManifest {
    pub fn new(source: &ResolvedSource, metadata: SourceMetadata, audio_ext: &str) -> Self {
        let snippet_files = snippet_file_names(&metadata.chapters, audio_ext);
        Self {
            identity: source.identity.clone(),
            source_url: source.url.clone(),
            title: metadata.title,
            duration_seconds: metadata.duration_seconds,
            chapters: metadata.chapters,
            snippet_files,
            created_at: Utc::now(),
        }
    }

    /// Load the manifest of a job, `None` if it was never written.
    pub fn load(layout: &JobLayout) -> Result<Option<Self>> {
        let path = layout.manifest_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let manifest: JobManifest = serde_json::from_str(&content)?;
        if manifest.snippet_files.len() != manifest.chapters.len() {
            return Err(ChapsplitError::Config(format!(
                "Corrupt manifest {:?}: {} chapters but {} snippet files",
                path,
                manifest.chapters.len(),
                manifest.snippet_files.len()
            )));
        }
        Ok(Some(manifest))
    }

    /// Write the manifest through a staging file.
    pub fn save(&self, layout: &JobLayout) -> Result<()> {
        let mut staged = layout.staging_file(layout.dir(), "manifest", "json")?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.flush()?;
        layout.commit(staged, &layout.manifest_path())
    }

    /// Chapters paired with their file names.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &Chapter, &str)> {
        self.chapters
            .iter()
            .zip(self.snippet_files.iter())
            .enumerate()
            .map(|(i, (chapter, file))| (i, chapter, file.as_str()))
    }
}

/// Persisted outcome of a source without chapter markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoChaptersRecord {
    pub identity: SourceIdentity,
    pub source_url: String,
    pub title: String,
    pub checked_at: DateTime<Utc>,
}

impl NoChaptersRecord {
    pub fn new(source: &ResolvedSource, title: impl Into<String>) -> Self {
        Self {
            identity: source.identity.clone(),
            source_url: source.url.clone(),
            title: title.into(),
            checked_at: Utc::now(),
        }
    }

    pub fn load(layout: &JobLayout) -> Result<Option<Self>> {
        match std::fs::read_to_string(layout.no_chapters_path()) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, layout: &JobLayout) -> Result<()> {
        let mut staged = layout.staging_file(layout.dir(), "no-chapters", "json")?;
        serde_json::to_writer_pretty(&mut staged, self)?;
        staged.flush()?;
        layout.commit(staged, &layout.no_chapters_path())
    }

    /// The error this record stands for.
    pub fn error(&self) -> ChapsplitError {
        ChapsplitError::NoChapters(self.identity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStore;
    use crate::source::SourceKind;

    fn manifest() -> JobManifest {
        let source = ResolvedSource {
            identity: SourceIdentity::new("xETEYG-az9E").unwrap(),
            url: "https://www.youtube.com/watch?v=xETEYG-az9E".into(),
            kind: SourceKind::YouTube,
        };
        let metadata = SourceMetadata {
            title: "Long Talk".into(),
            duration_seconds: Some(330.0),
            chapters: vec![
                Chapter::new("Intro", 0.0, 30.0),
                Chapter::new("Main", 30.0, 300.0),
                Chapter::new("Outro", 300.0, 330.0),
            ],
        };
        JobManifest::new(&source, metadata, "mp3")
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let layout = JobStore::new(dir.path(), "mp4", "mp3", 1)
            .layout(&SourceIdentity::new("nothing").unwrap());
        assert!(JobManifest::load(&layout).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest();
        let layout = JobStore::new(dir.path(), "mp4", "mp3", 1).layout(&manifest.identity);

        manifest.save(&layout).unwrap();
        let loaded = JobManifest::load(&layout).unwrap().unwrap();

        assert_eq!(loaded, manifest);
        assert_eq!(
            loaded.snippet_files,
            ["01-intro.mp3", "02-main.mp3", "03-outro.mp3"]
        );
    }

    #[test]
    fn test_entries_pair_chapters_with_files() {
        let manifest = manifest();
        let entries: Vec<_> = manifest.entries().map(|(i, c, f)| (i, c.title.clone(), f)).collect();
        assert_eq!(entries[2], (2, "Outro".to_string(), "03-outro.mp3"));
    }
}
