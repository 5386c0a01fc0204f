//! Delete-then-rename publishing of staged files.
//!
//! Publishing a group first deletes the group's previously published files
//! (`sitemap_<group>_<n>.xml` and their `.gz` siblings), then renames every
//! staged file in the directory, the index included, to its unprefixed name.
//! The rename pass is not limited to the group being published.
//!
//! This is not transactional. Failures are logged, collected in the returned
//! [`PublishReport`] and left for the next run to repair.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{info, warn};

use crate::writer::STAGING_PREFIX;
use crate::{Error, Result};

/// Outcome of one publish call.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Previously published files that were removed.
    pub deleted: Vec<PathBuf>,
    /// Final paths of files that were renamed into place.
    pub published: Vec<PathBuf>,
    /// Deletes and renames that failed.
    pub failures: Vec<Error>,
}

impl PublishReport {
    /// True when every delete and rename succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publishes staged files in one output directory.
#[derive(Debug, Clone)]
pub struct Publisher {
    directory: PathBuf,
}

impl Publisher {
    /// Publisher for `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Replace the published files of `group` with everything staged.
    pub fn publish(&self, group: &str) -> Result<PublishReport> {
        self.publish_all(&[group])
    }

    /// Delete the published files of every group in `groups`, then rename
    /// every staged file.
    pub fn publish_all<S: AsRef<str>>(&self, groups: &[S]) -> Result<PublishReport> {
        let mut report = PublishReport::default();

        for group in groups {
            self.delete_published(group.as_ref(), &mut report)?;
        }
        self.rename_staged(&mut report)?;

        info!(
            directory = %self.directory.display(),
            deleted = report.deleted.len(),
            published = report.published.len(),
            failures = report.failures.len(),
            "Published sitemaps"
        );
        Ok(report)
    }

    fn delete_published(&self, group: &str, report: &mut PublishReport) -> Result<()> {
        let pattern = published_pattern(group)?;

        for path in self.entries_matching(|name| pattern.is_match(name))? {
            match fs::remove_file(&path) {
                Ok(()) => report.deleted.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(source) => {
                    warn!(
                        file = %path.display(),
                        error = %source,
                        "Failed to delete published sitemap"
                    );
                    report.failures.push(Error::Publish { path, source });
                },
            }
        }
        Ok(())
    }

    fn rename_staged(&self, report: &mut PublishReport) -> Result<()> {
        for path in self.entries_matching(is_staged_name)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let target = self.directory.join(&name[STAGING_PREFIX.len()..]);

            match fs::rename(&path, &target) {
                Ok(()) => report.published.push(target),
                Err(source) => {
                    warn!(
                        file = %path.display(),
                        error = %source,
                        "Failed to publish staged sitemap"
                    );
                    report.failures.push(Error::Publish { path, source });
                },
            }
        }
        Ok(())
    }

    /// Names of the plain `.xml` files currently published for `group`, in
    /// sequence order.
    pub fn published_files(&self, group: &str) -> Result<Vec<String>> {
        let pattern = published_pattern(group)?;
        let mut published: Vec<(u32, String)> = self
            .entries_matching(|name| pattern.is_match(name))?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_owned();
                let caps = pattern.captures(&name)?;
                if caps.get(2).is_some() {
                    return None;
                }
                let sequence = caps.get(1)?.as_str().parse().ok()?;
                Some((sequence, name))
            })
            .collect();
        published.sort();
        Ok(published.into_iter().map(|(_, name)| name).collect())
    }

    /// Files directly in the output directory whose name satisfies `keep`,
    /// sorted for a stable processing order.
    fn entries_matching(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.file_name().to_str().is_some_and(&keep) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Output directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn published_pattern(group: &str) -> Result<Regex> {
    Regex::new(&format!(r"^sitemap_{}_(\d+)\.xml(\.gz)?$", regex::escape(group)))
        .map_err(|e| Error::Config(format!("Invalid group name '{group}': {e}")))
}

fn is_staged_name(name: &str) -> bool {
    name.strip_prefix(STAGING_PREFIX).is_some_and(|rest| {
        rest.starts_with("sitemap") && (rest.ends_with(".xml") || rest.ends_with(".xml.gz"))
    })
}
