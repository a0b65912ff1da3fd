//! chapsplit - chaptered video to per-chapter audio clips
//!
//! Takes a video URL, downloads the media, extracts its audio track and cuts
//! one clip per chapter marker. Clips are listed with servable URLs and can
//! be bundled into a zip.
//!
//! # Overview
//!
//! Every stage writes its result under `<job_root>/<identity>/` and is skipped
//! when that result already exists, so submitting the same video twice costs
//! nothing and an interrupted job resumes where it stopped.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `source` - URL normalization into stable identities
//! - `media` - yt-dlp / ffmpeg wrappers behind traits
//! - `jobs` - Job state, on-disk layout and manifest
//! - `pipeline` - Fetch, transcode and split stages
//! - `orchestrator` - Per-identity job scheduling
//! - `registry` - Listing of ready clips
//! - `archive` - Zip bundles of ready clips
//! - `cli` - Command line and HTTP front-ends
//!
//! # Example
//!
//! ```rust,no_run
//! use chapsplit::config::Settings;
//! use chapsplit::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let handle = orchestrator.submit("https://youtu.be/xETEYG-az9E").await?;
//!     handle.wait().await;
//!
//!     for clip in orchestrator.snippets("https://youtu.be/xETEYG-az9E").await? {
//!         println!("{} -> {}", clip.title, clip.locator);
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod media;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod source;

#[cfg(test)]
mod testing;

pub use error::{ChapsplitError, Result};
