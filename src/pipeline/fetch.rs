//! Fetch stage: chapter metadata and raw media.

use super::Pipeline;
use crate::error::{ChapsplitError, Result};
use crate::jobs::{self, JobLayout, JobManifest, JobStatus, NoChaptersRecord};
use crate::source::ResolvedSource;
use tracing::{debug, info, instrument, warn};

impl Pipeline {
    /// Obtain the job manifest, querying the source only if nothing is stored.
    ///
    /// A source without chapters fails with `NoChapters`. Only a small record
    /// of that outcome is written, so the source is not asked again; no
    /// manifest, audio or clip ever exists for it.
    #[instrument(skip_all, fields(identity = %source.identity))]
    pub async fn fetch_metadata(
        &self,
        source: &ResolvedSource,
        layout: &JobLayout,
    ) -> Result<JobManifest> {
        let stored = {
            let layout = layout.clone();
            jobs::blocking(move || {
                Ok((JobManifest::load(&layout)?, NoChaptersRecord::load(&layout)?))
            })
            .await?
        };

        match stored {
            (Some(manifest), _) if !manifest.chapters.is_empty() => {
                self.reporter.stage_skipped(
                    &source.identity,
                    JobStatus::Fetching,
                    "metadata already fetched",
                );
                return Ok(manifest);
            }
            (_, Some(record)) => {
                debug!("'{}' is known to have no chapters", record.title);
                return Err(record.error());
            }
            _ => {}
        }

        let metadata = {
            let _permit = self.process_permit().await?;
            self.fetcher.fetch_metadata(&source.url).await?
        };

        if metadata.chapters.is_empty() {
            warn!("'{}' has no chapter markers", metadata.title);
            let record = NoChaptersRecord::new(source, metadata.title);
            let layout = layout.clone();
            return Err(jobs::blocking(move || {
                record.save(&layout)?;
                Ok(record.error())
            })
            .await?);
        }

        let manifest = JobManifest::new(source, metadata, layout.audio_ext());
        {
            let manifest = manifest.clone();
            let layout = layout.clone();
            jobs::blocking(move || {
                std::fs::create_dir_all(layout.dir())?;
                manifest.save(&layout)
            })
            .await?;
        }

        info!("Stored manifest with {} chapters", manifest.chapters.len());
        Ok(manifest)
    }

    /// Download the raw media unless it is already on disk.
    #[instrument(skip_all, fields(identity = %source.identity))]
    pub async fn fetch_media(&self, source: &ResolvedSource, layout: &JobLayout) -> Result<()> {
        let dest = layout.source_path();
        if layout.is_complete(&dest) {
            self.reporter
                .stage_skipped(&source.identity, JobStatus::Fetching, "media already downloaded");
            return Ok(());
        }

        let staged = layout.staging_file(layout.dir(), "source", layout.source_ext())?;
        {
            let _permit = self.process_permit().await?;
            self.fetcher.download(&source.url, staged.path()).await?;
        }

        layout
            .commit(staged, &dest)
            .map_err(|e| ChapsplitError::Fetch(format!("download incomplete: {}", e)))
    }
}
