//! Configuration for sitemap generation.
//!
//! Settings are plain data that can be built in code or loaded from a TOML
//! file. Validation happens once, before any file is written, so that a bad
//! setting aborts the run instead of leaving half a sitemap behind.
//!
//! ## Example Configuration File
//!
//! ```toml
//! sitemap_directory = "/var/www/public"
//! base_url = "https://example.com"
//! gzipped = true
//! max_urls_count_in_file = 50000
//! max_file_size = "10m"
//! optional_attributes = ["lastmod", "priority"]
//! disallow_urls = ['^https://example\.com/admin', '/\/private\//i']
//! publish_mode = "per_group"
//! ```
//!
//! ## Size strings
//!
//! `max_file_size` takes either a byte count or `<digits>[k|m]` where `k` is
//! KiB and `m` is MiB. Anything else is rejected:
//!
//! ```rust
//! use sitemap_core::MaxFileSize;
//!
//! assert_eq!("512k".parse::<MaxFileSize>()?.bytes(), 512 * 1024);
//! assert_eq!("2M".parse::<MaxFileSize>()?.bytes(), 2 * 1024 * 1024);
//! assert!("2g".parse::<MaxFileSize>().is_err());
//! # Ok::<(), sitemap_core::Error>(())
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, OptionalAttribute, Result};

/// Default byte limit for one sitemap file (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Upper bound on the size of a single sitemap file.
///
/// Zero disables the byte limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FileSizeRepr", into = "u64")]
pub struct MaxFileSize(u64);

impl MaxFileSize {
    /// No byte limit.
    pub const UNLIMITED: Self = Self(0);

    /// Limit of `bytes` bytes.
    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    /// The limit in bytes, zero when unlimited.
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl Default for MaxFileSize {
    fn default() -> Self {
        Self(DEFAULT_MAX_FILE_SIZE)
    }
}

impl From<MaxFileSize> for u64 {
    fn from(size: MaxFileSize) -> Self {
        size.0
    }
}

impl fmt::Display for MaxFileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

impl FromStr for MaxFileSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (digits, multiplier) = match trimmed.chars().last() {
            Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], 1024),
            Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
            _ => (trimmed, 1),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Config(format!(
                "Invalid max file size '{s}': expected <digits>[k|m]"
            )));
        }

        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .map(Self)
            .ok_or_else(|| Error::Config(format!("Max file size '{s}' is out of range")))
    }
}

/// Raw form accepted from configuration files.
#[derive(Deserialize)]
#[serde(untagged)]
enum FileSizeRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<FileSizeRepr> for MaxFileSize {
    type Error = String;

    fn try_from(repr: FileSizeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            FileSizeRepr::Bytes(bytes) => Ok(Self(bytes)),
            FileSizeRepr::Text(text) => text.parse().map_err(|e: Error| e.to_string()),
        }
    }
}

/// When the index is rebuilt and staged files are published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Rebuild the index over every file generated so far and publish after
    /// each group. A group's publish also renames files staged by groups that
    /// finished before it.
    #[default]
    PerGroup,
    /// Build the index once after the last group, then publish every group in
    /// a single pass.
    EndOfRun,
}

/// Settings for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Compress every closed sitemap and the index with gzip.
    pub gzipped: bool,

    /// Directory where staged and published files live.
    pub sitemap_directory: PathBuf,

    /// Maximum number of URLs per file. Zero disables the limit.
    pub max_urls_count_in_file: usize,

    /// Maximum size of one uncompressed sitemap file.
    pub max_file_size: MaxFileSize,

    /// Optional attributes to emit after `<loc>`, in order.
    pub optional_attributes: Vec<OptionalAttribute>,

    /// Patterns of URLs to leave out of every sitemap.
    pub disallow_urls: Vec<String>,

    /// Absolute URL under which the sitemap files are served.
    pub base_url: String,

    /// Index and publish scheduling.
    pub publish_mode: PublishMode,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            gzipped: true,
            sitemap_directory: PathBuf::from("sitemaps"),
            max_urls_count_in_file: 0,
            max_file_size: MaxFileSize::default(),
            optional_attributes: OptionalAttribute::ALL.to_vec(),
            disallow_urls: Vec::new(),
            base_url: "http://localhost".to_string(),
            publish_mode: PublishMode::default(),
        }
    }
}

impl SitemapConfig {
    /// Settings with defaults for everything but the output location.
    pub fn new(sitemap_directory: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            sitemap_directory: sitemap_directory.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load settings from a TOML file.
    ///
    /// ```rust,no_run
    /// use sitemap_core::SitemapConfig;
    /// use std::path::Path;
    ///
    /// let config = SitemapConfig::load(Path::new("sitemap.toml"))?;
    /// println!("Writing to {}", config.sitemap_directory.display());
    /// # Ok::<(), sitemap_core::Error>(())
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    ///
    /// Malformed TOML, unknown attribute names and bad size strings are
    /// reported as [`Error::Serialization`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write settings to a TOML file. The parent directory must exist.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }

    /// Check settings that serde cannot check on its own.
    ///
    /// Disallow patterns are compiled separately by
    /// [`DisallowFilter::new`](crate::DisallowFilter::new).
    pub fn validate(&self) -> Result<()> {
        if self.sitemap_directory.as_os_str().is_empty() {
            return Err(Error::Config("sitemap_directory must not be empty".into()));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url '{}': {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Invalid base_url '{}': scheme must be http or https",
                self.base_url
            )));
        }

        for (idx, attr) in self.optional_attributes.iter().enumerate() {
            if self.optional_attributes[..idx].contains(attr) {
                return Err(Error::Config(format!(
                    "optional_attributes lists '{attr}' more than once"
                )));
            }
        }

        Ok(())
    }

    /// Enable or disable gzip.
    #[must_use]
    pub const fn with_gzip(mut self, gzipped: bool) -> Self {
        self.gzipped = gzipped;
        self
    }

    /// Set the URL count limit (zero for unlimited).
    #[must_use]
    pub const fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls_count_in_file = max_urls;
        self
    }

    /// Set the byte limit.
    #[must_use]
    pub const fn with_max_file_size(mut self, size: MaxFileSize) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set the byte limit from a size string such as `"2m"` or `"512k"`.
    pub fn set_max_file_size(&mut self, size: &str) -> Result<()> {
        self.max_file_size = size.parse()?;
        Ok(())
    }

    /// Set the optional attributes to emit.
    #[must_use]
    pub fn with_optional_attributes(mut self, attributes: Vec<OptionalAttribute>) -> Self {
        self.optional_attributes = attributes;
        self
    }

    /// Set the disallow patterns.
    #[must_use]
    pub fn with_disallow_urls<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallow_urls = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the publish scheduling.
    #[must_use]
    pub const fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish_mode = mode;
        self
    }
}
