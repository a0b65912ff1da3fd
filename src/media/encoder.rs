//! Audio encoding via ffmpeg.

use super::process;
use crate::config::EncodeSettings;
use crate::error::{ChapsplitError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Trait for audio encoding backends.
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Derive the full-length audio track from the raw media.
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<()>;

    /// Cut `[start, start + duration)` out of `source` into `dest`.
    async fn trim(&self, source: &Path, dest: &Path, start: f64, duration: f64) -> Result<()>;

    /// Duration of an audio file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// ffmpeg/ffprobe backed encoder.
pub struct FfmpegEncoder {
    program: String,
    probe_program: String,
    codec: String,
    quality: String,
    transcode_timeout: Duration,
    trim_timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(settings: &EncodeSettings) -> Self {
        Self {
            program: settings.program.clone(),
            probe_program: settings.probe_program.clone(),
            codec: settings.audio_codec.clone(),
            quality: settings.quality.clone(),
            transcode_timeout: settings.transcode_timeout(),
            trim_timeout: settings.trim_timeout(),
        }
    }

    /// Trim by stream copy (fast, no quality loss).
    async fn trim_copy(&self, source: &Path, dest: &Path, start: f64, duration: f64) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-ss").arg(format!("{:.3}", start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", duration))
            .arg("-c").arg("copy")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest);

        process::run(cmd, &self.program, self.trim_timeout)
            .await
            .map(|_| ())
            .map_err(|f| f.into_error(ChapsplitError::Encode))
    }

    /// Trim by re-encoding.
    async fn trim_encode(&self, source: &Path, dest: &Path, start: f64, duration: f64) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-ss").arg(format!("{:.3}", start))
            .arg("-i").arg(source)
            .arg("-t").arg(format!("{:.3}", duration))
            .arg("-codec:a").arg(&self.codec)
            .arg("-qscale:a").arg(&self.quality)
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest);

        process::run(cmd, &self.program, self.trim_timeout)
            .await
            .map(|_| ())
            .map_err(|f| f.into_error(ChapsplitError::Encode))
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    #[instrument(skip_all)]
    async fn extract_audio(&self, source: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting audio from {:?}", source);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-i").arg(source)
            .arg("-vn")
            .arg("-codec:a").arg(&self.codec)
            .arg("-qscale:a").arg(&self.quality)
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest);

        process::run(cmd, &self.program, self.transcode_timeout)
            .await
            .map_err(|f| f.into_error(ChapsplitError::Encode))?;

        Ok(())
    }

    #[instrument(skip(self, source, dest))]
    async fn trim(&self, source: &Path, dest: &Path, start: f64, duration: f64) -> Result<()> {
        match self.trim_copy(source, dest, start, duration).await {
            Ok(()) => Ok(()),
            Err(ChapsplitError::ToolNotFound(tool)) => Err(ChapsplitError::ToolNotFound(tool)),
            Err(e) => {
                warn!("Stream copy failed ({}), re-encoding clip", e);
                self.trim_encode(source, dest, start, duration).await
            }
        }
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut cmd = Command::new(&self.probe_program);
        cmd.arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path);

        let output = process::run(cmd, &self.probe_program, self.trim_timeout)
            .await
            .map_err(|f| f.into_error(ChapsplitError::Encode))?;

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Read `format.duration` from ffprobe's JSON output.
fn parse_probe_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| ChapsplitError::Encode("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ChapsplitError::Encode("Could not determine audio duration".into()))
}
