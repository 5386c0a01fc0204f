//! Staged sitemap files and their gzip finalization.
//!
//! Files are written under a staging name (the published name prefixed with
//! [`STAGING_PREFIX`]) so that they never match the naming pattern of published
//! files until [`publish`](crate::publish) renames them.
//!
//! A [`SitemapFile`] is an open file. Closing it consumes the value and yields
//! a [`ClosedFile`], so a file cannot be written after its closing tag.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::{Error, Result};

/// Prefix that marks a file as staged.
pub const STAGING_PREFIX: &str = "_";

/// Suffix appended to compressed siblings.
pub const GZIP_SUFFIX: &str = ".gz";

/// Header written at the top of every sitemap file.
pub const URLSET_HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9""#,
    r#" xmlns:image="http://www.google.com/schemas/sitemap-image/1.1""#,
    r#" xmlns:video="http://www.google.com/schemas/sitemap-video/1.1">"#,
);

/// Footer closing every sitemap file.
pub const URLSET_FOOTER: &str = "\n</urlset>";

/// Read size used while compressing.
const COMPRESS_CHUNK_SIZE: usize = 512 * 1024;

/// Published file name of segment `sequence` of `group`.
#[must_use]
pub fn sitemap_file_name(group: &str, sequence: u32) -> String {
    format!("sitemap_{group}_{sequence}.xml")
}

/// Staging path for a published file name.
#[must_use]
pub fn staged_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(format!("{STAGING_PREFIX}{file_name}"))
}

/// Path of the compressed sibling of `path`.
#[must_use]
pub fn gzip_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(GZIP_SUFFIX);
    PathBuf::from(name)
}

/// One open, staged sitemap file.
#[derive(Debug)]
pub struct SitemapFile {
    file_name: String,
    path: PathBuf,
    sequence: u32,
    out: BufWriter<File>,
    url_count: usize,
    byte_size: u64,
}

impl SitemapFile {
    /// Create the staged file for segment `sequence` of `group` and write the
    /// `<urlset>` header.
    pub fn begin(dir: &Path, group: &str, sequence: u32) -> Result<Self> {
        let file_name = sitemap_file_name(group, sequence);
        let path = staged_path(dir, &file_name);

        let file = File::create(&path).map_err(|source| Error::FileWrite {
            path: path.clone(),
            source,
        })?;

        let mut sitemap = Self {
            file_name,
            path,
            sequence,
            out: BufWriter::new(file),
            url_count: 0,
            byte_size: 0,
        };
        sitemap.write_raw(URLSET_HEADER)?;

        debug!(file = %sitemap.file_name, "Opened sitemap file");
        Ok(sitemap)
    }

    /// Append one serialized `<url>` fragment.
    pub fn append(&mut self, fragment: &str) -> Result<()> {
        self.write_raw(fragment)?;
        self.url_count += 1;
        Ok(())
    }

    /// Write the closing tag and release the handle.
    pub fn end(mut self) -> Result<ClosedFile> {
        self.write_raw(URLSET_FOOTER)?;
        self.out.flush().map_err(|source| Error::FileWrite {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            file = %self.file_name,
            urls = self.url_count,
            bytes = self.byte_size,
            "Closed sitemap file"
        );

        Ok(ClosedFile {
            file_name: self.file_name,
            path: self.path,
            sequence: self.sequence,
            url_count: self.url_count,
            byte_size: self.byte_size,
        })
    }

    /// Published name of this file.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Staged path of this file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1-based position of this file within its group.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// URLs written so far.
    #[must_use]
    pub const fn url_count(&self) -> usize {
        self.url_count
    }

    /// Bytes written so far, header included.
    #[must_use]
    pub const fn byte_size(&self) -> u64 {
        self.byte_size
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .map_err(|source| Error::FileWrite {
                path: self.path.clone(),
                source,
            })?;
        self.byte_size += text.len() as u64;
        Ok(())
    }
}

/// A finished sitemap file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedFile {
    /// Published name.
    pub file_name: String,
    /// Staged path.
    pub path: PathBuf,
    /// 1-based position within the group.
    pub sequence: u32,
    /// URLs in the file.
    pub url_count: usize,
    /// Size of the file in bytes.
    pub byte_size: u64,
}

/// Compress `path` into a `.gz` sibling at maximum compression.
///
/// The source is streamed in fixed-size chunks. The gzip header carries no
/// file name or modification time, so identical input yields identical output.
/// A partially written `.gz` is removed when compression fails.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = gzip_path(path);
    let compression_error = |source: io::Error| Error::Compression {
        path: path.to_path_buf(),
        source,
    };

    let mut input = File::open(path).map_err(compression_error)?;
    let output = File::create(&gz_path).map_err(compression_error)?;

    if let Err(e) = write_gzip(&mut input, output) {
        if let Err(cleanup) = fs::remove_file(&gz_path) {
            debug!(
                file = %gz_path.display(),
                error = %cleanup,
                "Failed to remove partial archive"
            );
        }
        return Err(compression_error(e));
    }

    debug!(file = %gz_path.display(), "Compressed sitemap file");
    Ok(gz_path)
}

fn write_gzip(input: &mut File, output: File) -> io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::best());

    let mut chunk = vec![0u8; COMPRESS_CHUNK_SIZE];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        encoder.write_all(&chunk[..read])?;
    }

    encoder.finish()?.flush()
}
