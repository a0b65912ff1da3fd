//! Source identity resolution.
//!
//! A submitted URL is reduced to a stable [`SourceIdentity`] used as the job
//! key, the lock key and the on-disk directory name. Resolution is
//! trait-based so new URL families can be added next to YouTube.

mod web;
mod youtube;

pub use web::WebSource;
pub use youtube::YoutubeSource;

use crate::error::{ChapsplitError, Result};
use serde::{Deserialize, Serialize};

/// Kind of media source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    YouTube,
    Web,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::YouTube => write!(f, "youtube"),
            SourceKind::Web => write!(f, "web"),
        }
    }
}

/// Stable, path-safe key for a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceIdentity(String);

impl SourceIdentity {
    /// Wrap an identity string, rejecting anything unsafe as a directory name.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= 64
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(value))
        } else {
            Err(ChapsplitError::InvalidInput(format!(
                "Not a valid source identity: {}",
                value
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A submitted URL after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub identity: SourceIdentity,
    /// Canonical URL handed to the downloader.
    pub url: String,
    pub kind: SourceKind,
}

/// Trait for URL families that can be turned into an identity.
pub trait SourceResolver: Send + Sync {
    /// Get the source kind.
    fn kind(&self) -> SourceKind;

    /// Check if this resolver can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Normalize the input, or `None` if it is not understood.
    fn resolve(&self, input: &str) -> Option<ResolvedSource>;
}

/// Detect the appropriate resolver for the given input.
pub fn detect_source(input: &str) -> Option<Box<dyn SourceResolver>> {
    let youtube = YoutubeSource::new();
    if youtube.can_handle(input) {
        return Some(Box::new(youtube));
    }

    let web = WebSource::new();
    if web.can_handle(input) {
        return Some(Box::new(web));
    }

    None
}

/// Resolve a submitted URL into its stable identity.
pub fn resolve(input: &str) -> Result<ResolvedSource> {
    let input = input.trim();
    detect_source(input)
        .and_then(|source| source.resolve(input))
        .ok_or_else(|| {
            ChapsplitError::InvalidInput(format!("Could not parse source URL: {}", input))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rejects_path_segments() {
        assert!(SourceIdentity::new("dQw4w9WgXcQ").is_ok());
        assert!(SourceIdentity::new("../etc").is_err());
        assert!(SourceIdentity::new("a/b").is_err());
        assert!(SourceIdentity::new("").is_err());
    }

    #[test]
    fn test_same_video_different_urls_share_identity() {
        let a = resolve("https://www.youtube.com/watch?v=xETEYG-az9E").unwrap();
        let b = resolve("https://youtu.be/xETEYG-az9E?t=42").unwrap();
        let c = resolve("  xETEYG-az9E ").unwrap();

        assert_eq!(a.identity, b.identity);
        assert_eq!(b.identity, c.identity);
        assert_eq!(a.url, "https://www.youtube.com/watch?v=xETEYG-az9E");
    }

    #[test]
    fn test_generic_url_falls_back_to_web() {
        let resolved = resolve("https://vimeo.com/123456").unwrap();
        assert_eq!(resolved.kind, SourceKind::Web);
        assert!(resolved.identity.as_str().starts_with("web-"));
    }

    #[test]
    fn test_garbage_is_invalid_input() {
        let err = resolve("not a url").unwrap_err();
        assert!(matches!(err, ChapsplitError::InvalidInput(_)));
    }
}
