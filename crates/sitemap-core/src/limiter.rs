//! Rotation decision for sitemap files.
//!
//! A file rotates when it already holds the maximum number of URLs, or when
//! the next fragment would push it past the byte limit. A limit of zero
//! disables that check.

use crate::config::SitemapConfig;

/// Count and byte limits for one sitemap file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum URLs per file, zero for unlimited.
    pub max_count: usize,
    /// Maximum bytes per file, zero for unlimited.
    pub max_bytes: u64,
}

impl Limits {
    /// No limits at all.
    pub const UNLIMITED: Self = Self {
        max_count: 0,
        max_bytes: 0,
    };

    /// Limits taken from the run configuration.
    #[must_use]
    pub const fn from_config(config: &SitemapConfig) -> Self {
        Self {
            max_count: config.max_urls_count_in_file,
            max_bytes: config.max_file_size.bytes(),
        }
    }

    /// Whether writing a fragment of `pending` bytes requires a fresh file.
    #[must_use]
    pub const fn exceeded_by(
        &self,
        current_count: usize,
        current_bytes: u64,
        pending: u64,
    ) -> bool {
        exceeds(
            current_count,
            current_bytes,
            pending,
            self.max_count,
            self.max_bytes,
        )
    }
}

/// Decide whether the current file must rotate before the next write.
///
/// The count check uses exact equality: it fires when the file has just
/// reached `max_count`, which holds as long as it runs before every write.
///
/// ```rust
/// use sitemap_core::limiter::exceeds;
///
/// assert!(!exceeds(1, 100, 50, 2, 0));
/// assert!(exceeds(2, 100, 50, 2, 0));
/// assert!(exceeds(0, 100, 50, 0, 149));
/// assert!(!exceeds(0, 100, 50, 0, 150));
/// ```
#[must_use]
pub const fn exceeds(
    current_count: usize,
    current_bytes: u64,
    pending: u64,
    max_count: usize,
    max_bytes: u64,
) -> bool {
    (max_count > 0 && current_count == max_count)
        || (max_bytes > 0 && current_bytes.saturating_add(pending) > max_bytes)
}
