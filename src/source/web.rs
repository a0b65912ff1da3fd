//! Generic http(s) source resolution.
//!
//! Any URL the downloader might understand. The identity is a digest of the
//! normalized URL, so it stays stable and path-safe whatever the URL holds.

use super::{ResolvedSource, SourceIdentity, SourceKind, SourceResolver};
use url::Url;

/// Resolver for arbitrary http(s) URLs.
pub struct WebSource;

impl WebSource {
    pub fn new() -> Self {
        Self
    }

    fn parse(input: &str) -> Option<Url> {
        let mut url = Url::parse(input.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        url.set_fragment(None);
        Some(url)
    }

    fn identity_for(url: &Url) -> Option<SourceIdentity> {
        let digest = format!("{:x}", md5::compute(url.as_str().as_bytes()));
        SourceIdentity::new(format!("web-{}", &digest[..16])).ok()
    }
}

impl Default for WebSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceResolver for WebSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn can_handle(&self, input: &str) -> bool {
        Self::parse(input).is_some()
    }

    fn resolve(&self, input: &str) -> Option<ResolvedSource> {
        let url = Self::parse(input)?;
        let identity = Self::identity_for(&url)?;

        Some(ResolvedSource {
            identity,
            url: url.to_string(),
            kind: self.kind(),
        })
    }
}
