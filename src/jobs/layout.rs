//! On-disk layout of a job and the artifact gates.
//!
//! ```text
//! <job-root>/<identity>/job.json
//! <job-root>/<identity>/no-chapters.json   (instead of everything else)
//! <job-root>/<identity>/source.<ext>
//! <job-root>/<identity>/audio.<ext>
//! <job-root>/<identity>/snippets/<n>-<sanitized-title>.<ext>
//! ```
//!
//! Artifacts are produced into a staging file next to their final path and
//! renamed into place only once complete. A file at a final path is
//! therefore always a finished artifact, and existence (plus a minimum size)
//! is the whole idempotency check.

use crate::config::Settings;
use crate::error::{ChapsplitError, Result};
use crate::source::SourceIdentity;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Staging files start with this prefix.
const STAGING_PREFIX: &str = ".staging-";

/// Builds [`JobLayout`]s under a common root.
#[derive(Debug, Clone)]
pub struct JobStore {
    root: PathBuf,
    source_ext: String,
    audio_ext: String,
    min_artifact_bytes: u64,
}

impl JobStore {
    pub fn new(
        root: impl Into<PathBuf>,
        source_ext: impl Into<String>,
        audio_ext: impl Into<String>,
        min_artifact_bytes: u64,
    ) -> Self {
        Self {
            root: root.into(),
            source_ext: source_ext.into(),
            audio_ext: audio_ext.into(),
            min_artifact_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.job_root(),
            &settings.fetch.source_extension,
            &settings.encode.audio_extension,
            settings.pipeline.min_artifact_bytes,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self, identity: &SourceIdentity) -> JobLayout {
        JobLayout {
            dir: self.root.join(identity.as_str()),
            source_ext: self.source_ext.clone(),
            audio_ext: self.audio_ext.clone(),
            min_artifact_bytes: self.min_artifact_bytes,
        }
    }
}

/// Paths and gates for one job.
#[derive(Debug, Clone)]
pub struct JobLayout {
    dir: PathBuf,
    source_ext: String,
    audio_ext: String,
    min_artifact_bytes: u64,
}

impl JobLayout {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join("job.json")
    }

    pub fn no_chapters_path(&self) -> PathBuf {
        self.dir.join("no-chapters.json")
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.join(format!("source.{}", self.source_ext))
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(format!("audio.{}", self.audio_ext))
    }

    pub fn snippets_dir(&self) -> PathBuf {
        self.dir.join("snippets")
    }

    pub fn snippet_path(&self, file_name: &str) -> PathBuf {
        self.snippets_dir().join(file_name)
    }

    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    pub fn audio_ext(&self) -> &str {
        &self.audio_ext
    }

    /// The idempotency gate: a regular file of at least the minimum size.
    pub fn is_complete(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.len() >= self.min_artifact_bytes)
            .unwrap_or(false)
    }

    /// Create a staging file in `dir` whose name ends in `.<ext>`.
    ///
    /// Dropping the returned file without [`JobLayout::commit`] removes it.
    pub fn staging_file(&self, dir: &Path, label: &str, ext: &str) -> Result<NamedTempFile> {
        std::fs::create_dir_all(dir)?;
        let file = tempfile::Builder::new()
            .prefix(&format!("{}{}-", STAGING_PREFIX, label))
            .suffix(&format!(".{}", ext))
            .tempfile_in(dir)?;
        Ok(file)
    }

    /// Move a finished staging file to its final path.
    pub fn commit(&self, staged: NamedTempFile, dest: &Path) -> Result<()> {
        // by path: the writer may have replaced the file we created
        let size = std::fs::metadata(staged.path())?.len();
        if size < self.min_artifact_bytes {
            return Err(ChapsplitError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("refusing to commit {} byte artifact to {:?}", size, dest),
            )));
        }

        staged.persist(dest).map_err(|e| ChapsplitError::Io(e.error))?;
        debug!("Committed {:?} ({} bytes)", dest, size);
        Ok(())
    }

    /// Remove staging files left behind by a run that died mid-write.
    pub fn sweep_staging(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in [self.dir.clone(), self.snippets_dir()] {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
                    std::fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!("Removed {} stale staging files in {:?}", removed, self.dir);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store(root: &Path) -> JobStore {
        JobStore::new(root, "mp4", "mp3", 1)
    }

    #[test]
    fn test_paths_are_keyed_by_identity() {
        let store = store(Path::new("/srv/jobs"));
        let layout = store.layout(&SourceIdentity::new("xETEYG-az9E").unwrap());

        assert_eq!(layout.source_path(), PathBuf::from("/srv/jobs/xETEYG-az9E/source.mp4"));
        assert_eq!(layout.audio_path(), PathBuf::from("/srv/jobs/xETEYG-az9E/audio.mp3"));
        assert_eq!(
            layout.snippet_path("01-intro.mp3"),
            PathBuf::from("/srv/jobs/xETEYG-az9E/snippets/01-intro.mp3")
        );
    }

    #[test]
    fn test_empty_file_is_not_complete() {
        let dir = tempfile::tempdir().unwrap();
        let layout = store(dir.path()).layout(&SourceIdentity::new("abc").unwrap());
        std::fs::create_dir_all(layout.dir()).unwrap();

        let audio = layout.audio_path();
        assert!(!layout.is_complete(&audio));

        std::fs::write(&audio, b"").unwrap();
        assert!(!layout.is_complete(&audio));

        std::fs::write(&audio, b"ID3").unwrap();
        assert!(layout.is_complete(&audio));
    }

    #[test]
    fn test_dropped_staging_file_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = store(dir.path()).layout(&SourceIdentity::new("abc").unwrap());

        {
            let mut staged = layout.staging_file(layout.dir(), "audio", "mp3").unwrap();
            staged.write_all(b"half an mp3").unwrap();
            assert!(staged.path().to_string_lossy().ends_with(".mp3"));
        }

        assert_eq!(std::fs::read_dir(layout.dir()).unwrap().count(), 0);
        assert!(!layout.is_complete(&layout.audio_path()));
    }

    #[test]
    fn test_commit_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let layout = store(dir.path()).layout(&SourceIdentity::new("abc").unwrap());

        let mut staged = layout.staging_file(layout.dir(), "audio", "mp3").unwrap();
        staged.write_all(b"full mp3").unwrap();
        layout.commit(staged, &layout.audio_path()).unwrap();

        assert_eq!(std::fs::read(layout.audio_path()).unwrap(), b"full mp3");
    }

    #[test]
    fn test_commit_refuses_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let layout = store(dir.path()).layout(&SourceIdentity::new("abc").unwrap());

        let staged = layout.staging_file(layout.dir(), "audio", "mp3").unwrap();
        assert!(layout.commit(staged, &layout.audio_path()).is_err());
        assert!(!layout.audio_path().exists());
    }

    #[test]
    fn test_sweep_removes_only_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = store(dir.path()).layout(&SourceIdentity::new("abc").unwrap());
        std::fs::create_dir_all(layout.snippets_dir()).unwrap();

        std::fs::write(layout.dir().join(".staging-source-x1.mp4"), b"partial").unwrap();
        std::fs::write(layout.snippets_dir().join(".staging-clip-x2.mp3"), b"partial").unwrap();
        std::fs::write(layout.snippet_path("01-intro.mp3"), b"done").unwrap();

        assert_eq!(layout.sweep_staging().unwrap(), 2);
        assert!(layout.snippet_path("01-intro.mp3").exists());
    }
}
