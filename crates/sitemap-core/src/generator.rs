//! Run orchestration: groups, index and publishing.
//!
//! A [`SitemapGenerator`] holds the run's configuration and its registered
//! groups. [`SitemapGenerator::generate`] consumes it, so the open file and the
//! generated file set belong to exactly one run.

use std::fs;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::{PublishMode, SitemapConfig};
use crate::filter::DisallowFilter;
use crate::index::{GeneratedFileSet, INDEX_FILE_NAME, build_index, write_index};
use crate::limiter::Limits;
use crate::publish::Publisher;
use crate::rotation::{GroupStats, RotationController, RotationSettings};
use crate::source::{BATCH_SIZE, BatchSource, RecordStream};
use crate::writer::{compress_file, gzip_path, staged_path};
use crate::{Error, Result};

struct Group<'a> {
    name: String,
    source: Box<dyn RecordStream + 'a>,
}

/// Generates sitemap files for a set of named groups.
///
/// ```rust,no_run
/// use sitemap_core::{IterSource, SitemapConfig, SitemapGenerator, UrlRecord};
///
/// let config = SitemapConfig::new("public/sitemaps", "https://example.com/sitemaps")
///     .with_max_urls(50_000);
///
/// let mut generator = SitemapGenerator::new(config)?;
/// generator.add_source("pages", IterSource::new(vec![UrlRecord::new("https://example.com/")]))?;
///
/// let report = generator.generate()?;
/// println!("{} files, {} issues", report.files.len(), report.issues.len());
/// # Ok::<(), sitemap_core::Error>(())
/// ```
pub struct SitemapGenerator<'a> {
    config: SitemapConfig,
    filter: DisallowFilter,
    groups: Vec<Group<'a>>,
}

/// Result of one group.
#[derive(Debug)]
pub struct GroupReport {
    /// Group name.
    pub name: String,
    /// Counters collected while writing. Files are listed even when the group
    /// later aborted and its staged files were removed.
    pub stats: GroupStats,
    /// Error that aborted the group, if any.
    pub error: Option<Error>,
}

impl GroupReport {
    /// True when the group ran to completion.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Per-group outcomes, in registration order.
    pub groups: Vec<GroupReport>,
    /// Names of every file listed in the final index.
    pub files: Vec<String>,
    /// Non-fatal problems: compression, index write and publish failures.
    pub issues: Vec<Error>,
}

impl GenerationReport {
    /// Total URLs written across all groups.
    #[must_use]
    pub fn urls_written(&self) -> usize {
        self.groups.iter().map(|g| g.stats.urls_written).sum()
    }

    /// True when every group completed and nothing was recorded as an issue.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.groups.iter().all(GroupReport::succeeded)
    }
}

impl<'a> SitemapGenerator<'a> {
    /// Validate `config` and compile its disallow patterns.
    pub fn new(config: SitemapConfig) -> Result<Self> {
        config.validate()?;
        let filter = DisallowFilter::new(&config.disallow_urls)?;
        Ok(Self {
            config,
            filter,
            groups: Vec::new(),
        })
    }

    /// Register a group. Groups are generated in registration order.
    pub fn add_source<S>(&mut self, name: impl Into<String>, source: S) -> Result<&mut Self>
    where
        S: BatchSource + 'a,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("group name must not be empty".into()));
        }
        if self.groups.iter().any(|g| g.name == name) {
            return Err(Error::Config(format!("group '{name}' is already registered")));
        }
        self.groups.push(Group {
            name,
            source: Box::new(source),
        });
        Ok(self)
    }

    /// Names of the registered groups.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }

    /// Configuration of this run.
    #[must_use]
    pub const fn config(&self) -> &SitemapConfig {
        &self.config
    }

    /// Generate every group, build the index and publish.
    ///
    /// A group that fails is rolled back and reported; the remaining groups
    /// still run. Only a missing output directory or a failure to list it
    /// while publishing ends the run with an error.
    pub fn generate(self) -> Result<GenerationReport> {
        let directory = self.config.sitemap_directory.clone();
        if !directory.is_dir() {
            return Err(Error::Config(format!(
                "sitemap_directory '{}' does not exist",
                directory.display()
            )));
        }

        let settings = RotationSettings {
            directory,
            limits: Limits::from_config(&self.config),
            attributes: self.config.optional_attributes.clone(),
            gzipped: self.config.gzipped,
        };
        let publisher = Publisher::new(&settings.directory);
        let mut generated = GeneratedFileSet::new();
        let mut report = GenerationReport::default();
        let mut completed = Vec::new();

        info!(
            groups = self.groups.len(),
            directory = %settings.directory.display(),
            mode = ?self.config.publish_mode,
            "Starting sitemap generation"
        );

        for mut group in self.groups {
            let group_report = run_group(
                &settings,
                &self.filter,
                &publisher,
                &group.name,
                group.source.as_mut(),
                &mut generated,
                &mut report.issues,
            );
            let succeeded = group_report.succeeded();
            report.groups.push(group_report);

            if !succeeded {
                continue;
            }
            if self.config.publish_mode == PublishMode::PerGroup {
                finalize(
                    &self.config,
                    &publisher,
                    &generated,
                    &[group.name.as_str()],
                    &mut report.issues,
                )?;
            }
            completed.push(group.name);
        }

        if self.config.publish_mode == PublishMode::EndOfRun {
            finalize(
                &self.config,
                &publisher,
                &generated,
                completed.as_slice(),
                &mut report.issues,
            )?;
        }

        report.files = generated.iter().map(str::to_owned).collect();
        info!(
            files = report.files.len(),
            urls = report.urls_written(),
            issues = report.issues.len(),
            "Finished sitemap generation"
        );
        Ok(report)
    }
}

#[instrument(skip_all, fields(group = %name))]
fn run_group(
    settings: &RotationSettings,
    filter: &DisallowFilter,
    publisher: &Publisher,
    name: &str,
    source: &mut dyn RecordStream,
    generated: &mut GeneratedFileSet,
    issues: &mut Vec<Error>,
) -> GroupReport {
    let files_before = generated.len();

    info!("Generating sitemap group");
    let (stats, error) = write_group(settings, filter, name, source, generated, issues);

    if let Some(error) = &error {
        warn!(error = %error, "Sitemap group aborted");
        discard_staged(settings, generated, files_before);
        keep_published(settings, publisher, name, generated, issues);
    } else {
        info!(
            urls = stats.urls_written,
            disallowed = stats.urls_disallowed,
            skipped = stats.urls_skipped,
            files = stats.files.len(),
            "Finished sitemap group"
        );
    }

    GroupReport {
        name: name.to_owned(),
        stats,
        error,
    }
}

fn write_group(
    settings: &RotationSettings,
    filter: &DisallowFilter,
    name: &str,
    source: &mut dyn RecordStream,
    generated: &mut GeneratedFileSet,
    issues: &mut Vec<Error>,
) -> (GroupStats, Option<Error>) {
    let mut controller = match RotationController::new(settings, name, generated, issues) {
        Ok(controller) => controller,
        Err(e) => return (GroupStats::default(), Some(e)),
    };

    let drained = source.drain(BATCH_SIZE, &mut |record| {
        if filter.is_disallowed(&record.loc()) {
            controller.note_disallowed();
            return Ok(());
        }
        controller.write_record(record)
    });

    // The open file is flushed and closed before an aborted group's staged
    // copies are removed.
    match (drained, controller.finish()) {
        (Ok(()), Ok(stats)) => (stats, None),
        (Err(e), finished) => (finished.unwrap_or_default(), Some(e)),
        (Ok(()), Err(e)) => (GroupStats::default(), Some(e)),
    }
}

/// Remove the staged files of an aborted group and withdraw their names.
fn discard_staged(settings: &RotationSettings, generated: &mut GeneratedFileSet, keep: usize) {
    for name in generated.iter().skip(keep) {
        let staged = staged_path(&settings.directory, name);
        for path in [gzip_path(&staged), staged] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(file = %path.display(), "Removed staged file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to remove staged file");
                },
            }
        }
    }
    generated.truncate(keep);
}

/// List an aborted group's previously published files in place of the ones it
/// failed to produce, so the index keeps pointing at them.
fn keep_published(
    settings: &RotationSettings,
    publisher: &Publisher,
    group: &str,
    generated: &mut GeneratedFileSet,
    issues: &mut Vec<Error>,
) {
    let names = match publisher.published_files(group) {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "Failed to list published files of aborted group");
            issues.push(e);
            return;
        },
    };

    for name in names {
        let compressed = gzip_path(&settings.directory.join(&name)).is_file();
        generated.push(name.as_str());
        if !compressed {
            generated.mark_uncompressed(&name);
        }
    }
}

/// Build and stage the index over every file generated so far, then publish
/// `groups`.
///
/// When the index cannot be written the groups are still published, so that
/// their stale segments are removed. The previously published index stays in
/// place until a later index write succeeds.
fn finalize<S: AsRef<str>>(
    config: &SitemapConfig,
    publisher: &Publisher,
    generated: &GeneratedFileSet,
    groups: &[S],
    issues: &mut Vec<Error>,
) -> Result<()> {
    let document = build_index(generated, &config.base_url, config.gzipped, &Utc::now());
    match write_index(publisher.directory(), &document) {
        Ok(index_path) => {
            if config.gzipped {
                if let Err(e) = compress_file(&index_path) {
                    warn!(error = %e, "Failed to compress sitemap index");
                    issues.push(e);
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "Failed to write sitemap index; keeping the published one");
            discard_staged_index(publisher.directory());
            issues.push(e);
        },
    }

    let published = publisher.publish_all(groups)?;
    issues.extend(published.failures);
    Ok(())
}

/// Remove a partially written staged index so the rename pass cannot publish it.
fn discard_staged_index(dir: &Path) {
    let staged = staged_path(dir, INDEX_FILE_NAME);
    for path in [gzip_path(&staged), staged] {
        if path.is_file() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(file = %path.display(), error = %e, "Failed to remove staged index");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::UrlRecord;
    use crate::source::{FnSource, IterSource};
    use tempfile::TempDir;

    fn config(dir: &Path) -> SitemapConfig {
        SitemapConfig::new(dir, "https://example.com").with_gzip(false)
    }

    fn pages(locs: &[&str]) -> IterSource<std::vec::IntoIter<UrlRecord>> {
        IterSource::new(locs.iter().map(|l| UrlRecord::new(*l)).collect::<Vec<_>>())
    }

    #[test]
    fn test_duplicate_group_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut generator = SitemapGenerator::new(config(dir.path())).unwrap();
        generator.add_source("pages", pages(&["/a"])).unwrap();

        let err = generator.add_source("pages", pages(&["/b"])).err().unwrap();
        assert_eq!(err.category(), "config");
        assert_eq!(generator.group_names().collect::<Vec<_>>(), vec!["pages"]);
    }

    #[test]
    fn test_invalid_disallow_pattern_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path()).with_disallow_urls(["/[unclosed/"]);
        assert!(matches!(SitemapGenerator::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_directory_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let generator = SitemapGenerator::new(config(&dir.path().join("missing"))).unwrap();
        assert!(matches!(generator.generate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_disallowed_records_are_counted() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path()).with_disallow_urls([r"^/admin"]);
        let mut generator = SitemapGenerator::new(config).unwrap();
        generator
            .add_source("pages", pages(&["/home", "/admin/x", "/admin/y"]))
            .unwrap();

        let report = generator.generate().unwrap();
        let stats = &report.groups[0].stats;
        assert_eq!(stats.urls_written, 1);
        assert_eq!(stats.urls_disallowed, 2);
    }

    #[test]
    fn test_failed_group_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let mut generator = SitemapGenerator::new(config(dir.path()).with_max_urls(1)).unwrap();
        let mut calls = 0;
        generator
            .add_source(
                "broken",
                FnSource::new(move |_| {
                    calls += 1;
                    match calls {
                        1 => Ok(Some(vec![UrlRecord::new("/x"), UrlRecord::new("/y")])),
                        _ => Err(Error::Source {
                            group: "broken".into(),
                            message: "connection reset".into(),
                        }),
                    }
                }),
            )
            .unwrap();

        let report = generator.generate().unwrap();

        assert!(!report.groups[0].succeeded());
        assert!(report.files.is_empty());
        assert!(!dir.path().join("_sitemap_broken_1.xml").exists());
        assert!(!dir.path().join("_sitemap_broken_2.xml").exists());
        assert!(!dir.path().join("sitemap_broken_1.xml").exists());
    }
}
