//! Snippet file naming.

use crate::jobs::Chapter;
use std::collections::HashSet;

/// Longest sanitized title kept in a file name.
const MAX_TITLE_LEN: usize = 80;

/// Reduce a chapter title to a storage- and URL-safe slug.
pub fn sanitize_title(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_TITLE_LEN);
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        "chapter".to_string()
    } else {
        slug.to_string()
    }
}

/// Assign `<n>-<slug>.<ext>` names, unique within the job.
///
/// `n` is the 1-based chapter position padded to the width of the chapter
/// count (at least two digits).
pub fn snippet_file_names(chapters: &[Chapter], ext: &str) -> Vec<String> {
    let width = chapters.len().to_string().len().max(2);
    let mut taken = HashSet::with_capacity(chapters.len());

    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let stem = format!("{:0width$}-{}", i + 1, sanitize_title(&chapter.title));
            let mut name = format!("{}.{}", stem, ext);
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}-{}.{}", stem, suffix, ext);
                suffix += 1;
            }
            name
        })
        .collect()
}
