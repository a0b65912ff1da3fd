//! Transcode stage: raw media → full audio track.

use super::Pipeline;
use crate::error::{ChapsplitError, Result};
use crate::jobs::{JobLayout, JobStatus};
use crate::source::SourceIdentity;
use tracing::{info, instrument};

impl Pipeline {
    /// Derive `audio.<ext>` from `source.<ext>` unless it already exists.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn transcode(&self, identity: &SourceIdentity, layout: &JobLayout) -> Result<()> {
        let dest = layout.audio_path();
        if layout.is_complete(&dest) {
            self.reporter
                .stage_skipped(identity, JobStatus::Transcoding, "audio already extracted");
            return Ok(());
        }

        let source = layout.source_path();
        if !layout.is_complete(&source) {
            return Err(ChapsplitError::Encode(format!(
                "raw media {:?} is missing",
                source
            )));
        }

        let staged = layout.staging_file(layout.dir(), "audio", layout.audio_ext())?;
        {
            let _permit = self.process_permit().await?;
            self.encoder.extract_audio(&source, staged.path()).await?;
        }

        layout
            .commit(staged, &dest)
            .map_err(|e| ChapsplitError::Encode(format!("audio output incomplete: {}", e)))?;

        info!("Audio track ready");
        Ok(())
    }
}
