//! Snippet registry.
//!
//! Lists the clips of a job straight from storage: the manifest gives the
//! chapter order and file names, and each file is checked for existence on
//! every call, so clips deleted behind our back drop out of the listing.

use crate::error::Result;
use crate::jobs::{JobManifest, JobStore};
use crate::source::{self, SourceIdentity};
use serde::Serialize;
use std::path::PathBuf;
use tracing::instrument;

/// A ready clip as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetEntry {
    pub index: usize,
    pub title: String,
    pub file_name: String,
    /// URL the clip is served under.
    pub locator: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct SnippetRegistry {
    store: JobStore,
    public_url: String,
}

impl SnippetRegistry {
    pub fn new(store: JobStore, public_url: &str) -> Self {
        Self {
            store,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of a clip, relative unless a public URL is configured.
    pub fn locator(&self, identity: &SourceIdentity, file_name: &str) -> String {
        format!("{}/media/{}/snippets/{}", self.public_url, identity, file_name)
    }

    /// Ready clips of a job, in chapter order. Unknown jobs list as empty.
    #[instrument(skip(self), fields(identity = %identity))]
    pub fn list(&self, identity: &SourceIdentity) -> Result<Vec<SnippetEntry>> {
        let layout = self.store.layout(identity);
        let Some(manifest) = JobManifest::load(&layout)? else {
            return Ok(Vec::new());
        };

        let entries = manifest
            .entries()
            .filter_map(|(index, chapter, file_name)| {
                let path = layout.snippet_path(file_name);
                layout.is_complete(&path).then(|| SnippetEntry {
                    index,
                    title: chapter.title.clone(),
                    file_name: file_name.to_string(),
                    locator: self.locator(identity, file_name),
                    start_seconds: chapter.start_seconds,
                    end_seconds: chapter.end_seconds,
                    path,
                })
            })
            .collect();

        Ok(entries)
    }

    /// [`SnippetRegistry::list`] for a submitted URL.
    pub fn list_url(&self, input: &str) -> Result<Vec<SnippetEntry>> {
        let resolved = source::resolve(input)?;
        self.list(&resolved.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Chapter;
    use crate::media::SourceMetadata;
    use crate::source::{ResolvedSource, SourceKind};
    use std::path::Path;

    fn seed(root: &Path) -> (JobStore, SourceIdentity) {
        let store = JobStore::new(root, "mp4", "mp3", 1);
        let source = ResolvedSource {
            identity: SourceIdentity::new("xETEYG-az9E").unwrap(),
            url: "https://www.youtube.com/watch?v=xETEYG-az9E".into(),
            kind: SourceKind::YouTube,
        };
        let metadata = SourceMetadata {
            title: "Long Talk".into(),
            duration_seconds: None,
            chapters: vec![
                Chapter::new("Intro", 0.0, 30.0),
                Chapter::new("Main", 30.0, 300.0),
                Chapter::new("Outro", 300.0, 330.0),
            ],
        };
        let layout = store.layout(&source.identity);
        let manifest = JobManifest::new(&source, metadata, "mp3");
        manifest.save(&layout).unwrap();

        std::fs::create_dir_all(layout.snippets_dir()).unwrap();
        for file in &manifest.snippet_files {
            std::fs::write(layout.snippet_path(file), b"clip").unwrap();
        }
        (store, source.identity)
    }

    #[test]
    fn test_lists_in_chapter_order() {
        let dir = tempfile::tempdir().unwrap();
        let (store, identity) = seed(dir.path());
        let registry = SnippetRegistry::new(store, "http://localhost:3001/");

        let entries = registry.list(&identity).unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Intro", "Main", "Outro"]);
        assert_eq!(
            entries[0].locator,
            "http://localhost:3001/media/xETEYG-az9E/snippets/01-intro.mp3"
        );
    }

    #[test]
    fn test_deleted_clip_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let (store, identity) = seed(dir.path());
        let layout = store.layout(&identity);
        let registry = SnippetRegistry::new(store, "");

        std::fs::remove_file(layout.snippet_path("02-main.mp3")).unwrap();

        let entries = registry.list(&identity).unwrap();
        let files: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(files, ["01-intro.mp3", "03-outro.mp3"]);
        assert_eq!(entries[1].index, 2);
        assert_eq!(entries[1].locator, "/media/xETEYG-az9E/snippets/03-outro.mp3");
    }

    #[test]
    fn test_unknown_job_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SnippetRegistry::new(JobStore::new(dir.path(), "mp4", "mp3", 1), "");
        assert!(registry.list_url("https://youtu.be/dQw4w9WgXcQ").unwrap().is_empty());
    }
}
