//! Sitemap index generation.
//!
//! The index lists every file generated so far in the run. All entries share
//! one `<lastmod>`, captured when the index is built, rather than the
//! modification time of each file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use quick_xml::escape::escape;
use tracing::debug;

use crate::writer::{GZIP_SUFFIX, staged_path};
use crate::{Error, Result};

/// Published name of the index file.
pub const INDEX_FILE_NAME: &str = "sitemap.xml";

const INDEX_HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#,
);

const INDEX_FOOTER: &str = "\n</sitemapindex>";

/// W3C date-time profile, e.g. `2024-05-01T12:30:00+00:00`.
const W3C_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Ordered names of every file generated during a run, across all groups.
///
/// A file whose gzip sibling could not be produced is marked so that the
/// index links the plain file instead of a missing `.gz`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedFileSet {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    compressed: bool,
}

impl GeneratedFileSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a newly generated file.
    pub fn push(&mut self, name: impl Into<String>) {
        self.entries.push(Entry {
            name: name.into(),
            compressed: true,
        });
    }

    /// Record that `name` has no gzip sibling.
    pub fn mark_uncompressed(&mut self, name: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.compressed = false;
        }
    }

    /// False when `name` was marked as lacking a gzip sibling.
    #[must_use]
    pub fn is_compressed(&self, name: &str) -> bool {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .is_some_and(|e| e.compressed)
    }

    /// Drop every name recorded after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Names in generation order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the index document.
///
/// Each entry's `<loc>` is `base_url/<name>` with `.gz` appended when the files
/// are compressed, except for files marked uncompressed.
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use sitemap_core::{GeneratedFileSet, build_index};
///
/// let mut files = GeneratedFileSet::new();
/// files.push("sitemap_pages_1.xml");
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let xml = build_index(&files, "https://example.com", true, &at);
///
/// assert!(xml.contains("<loc>https://example.com/sitemap_pages_1.xml.gz</loc>"));
/// assert!(xml.contains("<lastmod>2024-05-01T12:00:00+00:00</lastmod>"));
/// ```
pub fn build_index<Tz>(
    files: &GeneratedFileSet,
    base_url: &str,
    gzipped: bool,
    timestamp: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let lastmod = timestamp.format(W3C_FORMAT).to_string();
    let base = base_url.trim_end_matches('/');
    let mut out = String::from(INDEX_HEADER);
    for entry in &files.entries {
        let suffix = if gzipped && entry.compressed {
            GZIP_SUFFIX
        } else {
            ""
        };
        let loc = format!("{base}/{}{suffix}", entry.name);
        out.push_str("\n<sitemap>\n\t<loc>");
        out.push_str(&escape(loc.as_str()));
        out.push_str("</loc>\n\t<lastmod>");
        out.push_str(&lastmod);
        out.push_str("</lastmod>\n</sitemap>");
    }
    out.push_str(INDEX_FOOTER);
    out
}

/// Write the index document to its staging path and return that path.
pub fn write_index(dir: &Path, document: &str) -> Result<PathBuf> {
    let path = staged_path(dir, INDEX_FILE_NAME);
    fs::write(&path, document).map_err(|source| Error::FileWrite {
        path: path.clone(),
        source,
    })?;
    debug!(file = %path.display(), bytes = document.len(), "Wrote sitemap index");
    Ok(path)
}
