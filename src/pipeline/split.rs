//! Split stage: full audio track → one clip per chapter.

use super::Pipeline;
use crate::error::{ChapsplitError, Result};
use crate::jobs::{Chapter, JobLayout, JobManifest, Snippet, SnippetState};
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, instrument, warn};

impl Pipeline {
    /// Produce every missing clip, returning one snippet per chapter in
    /// chapter order.
    ///
    /// A chapter that cannot be split is recorded as failed on its own
    /// snippet; the other chapters are unaffected.
    #[instrument(skip_all, fields(identity = %manifest.identity))]
    pub async fn split(&self, layout: &JobLayout, manifest: &JobManifest) -> Result<Vec<Snippet>> {
        tokio::fs::create_dir_all(layout.snippets_dir()).await?;

        let audio = layout.audio_path();
        let total = manifest.chapters.len();
        let identity = &manifest.identity;

        // owned: the job future is spawned
        let work: Vec<(usize, Chapter, String)> = manifest
            .entries()
            .map(|(index, chapter, file_name)| (index, chapter.clone(), file_name.to_string()))
            .collect();

        let snippets = stream::iter(work)
            .map(|(index, chapter, file_name): (usize, Chapter, String)| {
                let audio = audio.clone();
                async move {
                    let state = match self
                        .split_chapter(layout, &audio, index, &chapter, &file_name)
                        .await
                    {
                        Ok(()) => SnippetState::Ready,
                        Err(e) => SnippetState::failed(&e),
                    };

                    let snippet = Snippet {
                        index,
                        title: chapter.title.clone(),
                        file_name,
                        chapter,
                        state,
                    };
                    self.reporter.chapter_finished(identity, &snippet, total);
                    snippet
                }
            })
            .buffered(self.max_concurrent_splits)
            .collect::<Vec<_>>()
            .await;

        Ok(snippets)
    }

    async fn split_chapter(
        &self,
        layout: &JobLayout,
        audio: &Path,
        index: usize,
        chapter: &Chapter,
        file_name: &str,
    ) -> Result<()> {
        let duration = chapter.validate(index)?;

        let dest = layout.snippet_path(file_name);
        if layout.is_complete(&dest) {
            debug!("Clip {} already exists", file_name);
            return Ok(());
        }

        if !layout.is_complete(audio) {
            return Err(ChapsplitError::Split(format!("audio track {:?} is missing", audio)));
        }

        let staged = layout.staging_file(&layout.snippets_dir(), "clip", layout.audio_ext())?;
        {
            let _permit = self.process_permit().await?;
            self.encoder
                .trim(audio, staged.path(), chapter.start_seconds, duration)
                .await?;

            if self.verify_durations {
                self.check_duration(staged.path(), file_name, duration).await;
            }
        }

        layout
            .commit(staged, &dest)
            .map_err(|e| ChapsplitError::Encode(format!("clip {} incomplete: {}", file_name, e)))
    }

    /// Compare a clip's length with its chapter's; mismatches are only logged.
    async fn check_duration(&self, clip: &Path, file_name: &str, expected: f64) {
        match self.encoder.probe_duration(clip).await {
            Ok(actual) if (actual - expected).abs() > self.duration_tolerance => warn!(
                "Clip {} is {:.2}s, chapter is {:.2}s",
                file_name, actual, expected
            ),
            Ok(_) => {}
            Err(e) => warn!("Could not probe {}: {}", file_name, e),
        }
    }
}
