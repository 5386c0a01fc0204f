//! Rotation of one group's records across numbered sitemap files.
//!
//! The controller owns the currently open file as an explicit state value:
//!
//! ```text
//! start ──▶ Open(file 1) ──limit──▶ Open(file 2) ── … ──end──▶ Closed
//! ```
//!
//! File 1 is opened when the group starts, so every group produces at least
//! one file even when no record survives filtering.
//!
//! Before each write the limiter is consulted with the open file's counters.
//! When it fires, the open file is closed (and compressed) and the next one is
//! opened before the pending fragment is written, so a fragment is never split
//! across two files. A file that holds no URL yet never rotates: an oversized
//! fragment is written on its own rather than leaving an empty file behind.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::index::GeneratedFileSet;
use crate::limiter::Limits;
use crate::record::{OptionalAttribute, SitemapRecord};
use crate::serializer::serialize_entry;
use crate::writer::{ClosedFile, SitemapFile, compress_file};
use crate::{Error, Result};

/// Settings shared by every group of a run.
#[derive(Debug, Clone)]
pub struct RotationSettings {
    /// Output directory.
    pub directory: PathBuf,
    /// Rotation limits.
    pub limits: Limits,
    /// Optional attributes to serialize.
    pub attributes: Vec<OptionalAttribute>,
    /// Compress closed files.
    pub gzipped: bool,
}

/// Counters for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// URLs written.
    pub urls_written: usize,
    /// Records excluded by the disallow filter.
    pub urls_disallowed: usize,
    /// Records skipped because their location was empty.
    pub urls_skipped: usize,
    /// Number of times a full file was rotated out.
    pub rotations: usize,
    /// Files produced, in order.
    pub files: Vec<ClosedFile>,
}

enum RotationState {
    Open(SitemapFile),
    Closed,
}

/// Writes one group's records into `sitemap_<group>_<n>.xml` files.
pub struct RotationController<'run> {
    settings: &'run RotationSettings,
    group: String,
    state: RotationState,
    sequence: u32,
    generated: &'run mut GeneratedFileSet,
    issues: &'run mut Vec<Error>,
    stats: GroupStats,
}

impl<'run> RotationController<'run> {
    /// Start a group and open its first file. The sequence index starts from
    /// zero for every group.
    pub fn new(
        settings: &'run RotationSettings,
        group: impl Into<String>,
        generated: &'run mut GeneratedFileSet,
        issues: &'run mut Vec<Error>,
    ) -> Result<Self> {
        let mut controller = Self {
            settings,
            group: group.into(),
            state: RotationState::Closed,
            sequence: 0,
            generated,
            issues,
            stats: GroupStats::default(),
        };
        let first = controller.open_next()?;
        controller.state = RotationState::Open(first);
        Ok(controller)
    }

    /// Serialize and write one record, rotating first if a limit is reached.
    pub fn write_record<R: SitemapRecord + ?Sized>(&mut self, record: &R) -> Result<()> {
        if record.loc().is_empty() {
            warn!(group = %self.group, "Skipping record with empty location");
            self.stats.urls_skipped += 1;
            return Ok(());
        }

        let fragment = serialize_entry(record, &self.settings.attributes);
        let pending = fragment.len() as u64;

        let mut file = match std::mem::replace(&mut self.state, RotationState::Closed) {
            RotationState::Open(file) if self.must_rotate(&file, pending) => {
                self.finish_file(file)?;
                self.stats.rotations += 1;
                debug!(group = %self.group, next = self.sequence + 1, "Rotating sitemap file");
                self.open_next()?
            },
            RotationState::Open(file) => file,
            RotationState::Closed => {
                return Err(Error::Config(format!(
                    "group '{}' is already finished",
                    self.group
                )));
            },
        };

        if file.url_count() == 0 && self.settings.limits.exceeded_by(0, file.byte_size(), pending) {
            warn!(
                file = %file.file_name(),
                bytes = pending,
                "Entry alone exceeds the file size limit; writing it anyway"
            );
        }
        let appended = file.append(&fragment);
        self.state = RotationState::Open(file);
        appended?;

        self.stats.urls_written += 1;
        Ok(())
    }

    /// Record that the disallow filter excluded a URL.
    pub fn note_disallowed(&mut self) {
        self.stats.urls_disallowed += 1;
    }

    /// Close the last file and return the group's counters.
    pub fn finish(mut self) -> Result<GroupStats> {
        if let RotationState::Open(file) = std::mem::replace(&mut self.state, RotationState::Closed)
        {
            self.finish_file(file)?;
        }
        Ok(self.stats)
    }

    fn must_rotate(&self, file: &SitemapFile, pending: u64) -> bool {
        file.url_count() > 0
            && self
                .settings
                .limits
                .exceeded_by(file.url_count(), file.byte_size(), pending)
    }

    fn open_next(&mut self) -> Result<SitemapFile> {
        self.sequence += 1;
        let file = SitemapFile::begin(&self.settings.directory, &self.group, self.sequence)?;
        self.generated.push(file.file_name());
        Ok(file)
    }

    fn finish_file(&mut self, file: SitemapFile) -> Result<()> {
        let closed = file.end()?;
        if self.settings.gzipped {
            if let Err(e) = compress_file(&closed.path) {
                warn!(
                    file = %closed.file_name,
                    error = %e,
                    "Failed to compress sitemap file; index will list the plain file"
                );
                self.generated.mark_uncompressed(&closed.file_name);
                self.issues.push(e);
            }
        }
        debug!(
            group = %self.group,
            file = %closed.file_name,
            urls = closed.url_count,
            "Finished sitemap file"
        );
        self.stats.files.push(closed);
        Ok(())
    }
}
