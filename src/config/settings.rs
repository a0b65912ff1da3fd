//! Configuration settings for chapsplit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub fetch: FetchSettings,
    pub encode: EncodeSettings,
    pub pipeline: PipelineSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory holding one subdirectory per job.
    pub job_root: String,
    /// Log level without -v (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.chapsplit".to_string(),
            job_root: "~/.chapsplit/jobs".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Media acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Downloader executable.
    pub program: String,
    /// Format selector passed to the downloader.
    pub format: String,
    /// Extension of the raw media artifact.
    pub source_extension: String,
    /// Timeout for the metadata query.
    pub metadata_timeout_seconds: u64,
    /// Timeout for the media download.
    pub download_timeout_seconds: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            format: "mp4".to_string(),
            source_extension: "mp4".to_string(),
            metadata_timeout_seconds: 120,
            download_timeout_seconds: 3600,
        }
    }
}

impl FetchSettings {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_seconds)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_seconds)
    }
}

/// Audio encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    /// Encoder executable.
    pub program: String,
    /// Prober executable (for clip durations).
    pub probe_program: String,
    /// Extension of the audio artifacts (full track and snippets).
    pub audio_extension: String,
    /// Audio codec passed to the encoder.
    pub audio_codec: String,
    /// VBR quality passed as `-qscale:a`.
    pub quality: String,
    /// Timeout for the full-track transcode.
    pub transcode_timeout_seconds: u64,
    /// Timeout for a single chapter trim.
    pub trim_timeout_seconds: u64,
    /// Check each new snippet's duration against its chapter.
    pub verify_durations: bool,
    /// Accepted difference between snippet and chapter duration.
    pub duration_tolerance_seconds: f64,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            probe_program: "ffprobe".to_string(),
            audio_extension: "mp3".to_string(),
            audio_codec: "libmp3lame".to_string(),
            quality: "2".to_string(),
            transcode_timeout_seconds: 1800,
            trim_timeout_seconds: 300,
            verify_durations: true,
            duration_tolerance_seconds: 1.5,
        }
    }
}

impl EncodeSettings {
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_seconds)
    }

    pub fn trim_timeout(&self) -> Duration {
        Duration::from_secs(self.trim_timeout_seconds)
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Jobs allowed to run at the same time.
    pub max_concurrent_jobs: usize,
    /// Chapters of one job split at the same time.
    pub max_concurrent_splits: usize,
    /// External processes allowed at the same time across all jobs (0 = CPU count).
    pub max_processes: usize,
    /// Smallest file size accepted as a finished artifact.
    pub min_artifact_bytes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_concurrent_splits: 4,
            max_processes: 0,
            min_artifact_bytes: 1,
        }
    }
}

impl PipelineSettings {
    /// Resolved process pool size.
    pub fn process_limit(&self) -> usize {
        if self.max_processes > 0 {
            return self.max_processes;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Prefix for snippet locators (empty = relative URLs).
    pub public_url: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            public_url: String::new(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ChapsplitError;

        if self.pipeline.max_concurrent_jobs == 0 {
            return Err(ChapsplitError::Config(
                "pipeline.max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.pipeline.max_concurrent_splits == 0 {
            return Err(ChapsplitError::Config(
                "pipeline.max_concurrent_splits must be at least 1".into(),
            ));
        }
        if self.encode.audio_extension.is_empty() || self.fetch.source_extension.is_empty() {
            return Err(ChapsplitError::Config(
                "artifact extensions must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ChapsplitError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chapsplit")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded job root path.
    pub fn job_root(&self) -> PathBuf {
        Self::expand_path(&self.general.job_root)
    }
}
