//! External media tooling.
//!
//! Acquisition (yt-dlp) and encoding (ffmpeg) sit behind the [`MediaFetcher`]
//! and [`MediaEncoder`] traits; every invocation goes through
//! [`process::run`] so it is bounded by a timeout.

mod encoder;
mod fetcher;
pub mod process;

pub use encoder::{FfmpegEncoder, MediaEncoder};
pub use fetcher::{parse_metadata, MediaFetcher, SourceMetadata, YtDlpFetcher};
