//! On-demand zip archives of a job's ready clips.

use crate::error::Result;
use crate::jobs;
use crate::registry::{SnippetEntry, SnippetRegistry};
use crate::source::SourceIdentity;
use std::io::{Cursor, Write};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundles the registry's current listing into a zip.
pub struct ArchiveBuilder {
    registry: Arc<SnippetRegistry>,
}

impl ArchiveBuilder {
    pub fn new(registry: Arc<SnippetRegistry>) -> Self {
        Self { registry }
    }

    /// Build a fresh archive. A job with no ready clips yields an empty zip.
    #[instrument(skip(self), fields(identity = %identity))]
    pub async fn build(&self, identity: &SourceIdentity) -> Result<Vec<u8>> {
        let registry = self.registry.clone();
        let identity = identity.clone();

        let (count, bytes) = jobs::blocking(move || {
            let entries = registry.list(&identity)?;
            Ok((entries.len(), write_archive(&entries)?))
        })
        .await?;

        info!("Built archive with {} clips ({} bytes)", count, bytes.len());
        Ok(bytes)
    }
}

/// Write entries into an in-memory zip, skipping clips that vanished since
/// they were listed.
pub fn write_archive(entries: &[SnippetEntry]) -> Result<Vec<u8>> {
    // mp3 does not compress further
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        let mut file = match std::fs::File::open(&entry.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} vanished before archiving", entry.file_name);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        zip.start_file(entry.file_name.as_str(), options)?;
        std::io::copy(&mut file, &mut zip)?;
    }

    let mut cursor = zip.finish()?;
    cursor.flush()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry(dir: &std::path::Path, index: usize, file_name: &str, body: &[u8]) -> SnippetEntry {
        let path = dir.join(file_name);
        std::fs::write(&path, body).unwrap();
        SnippetEntry {
            index,
            title: file_name.to_string(),
            file_name: file_name.to_string(),
            locator: format!("/media/x/snippets/{}", file_name),
            start_seconds: 0.0,
            end_seconds: 1.0,
            path,
        }
    }

    #[test]
    fn test_archive_contains_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            entry(dir.path(), 0, "01-intro.mp3", b"intro"),
            entry(dir.path(), 1, "02-main.mp3", b"main"),
        ];

        let bytes = write_archive(&entries).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut body = String::new();
        archive
            .by_name("02-main.mp3")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "main");
    }

    #[test]
    fn test_empty_listing_is_valid_empty_archive() {
        let bytes = write_archive(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut entries = vec![entry(dir.path(), 0, "01-intro.mp3", b"intro")];
        entries.push(SnippetEntry {
            path: dir.path().join("02-gone.mp3"),
            file_name: "02-gone.mp3".into(),
            ..entries[0].clone()
        });

        let bytes = write_archive(&entries).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
