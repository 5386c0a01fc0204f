//! Error types and handling for sitemap generation.
//!
//! A single error type covers every failure the engine can report. Errors are
//! categorized so callers can tell run-aborting problems (bad configuration)
//! from problems that only affect one file segment or one group.
//!
//! ## Error Categories
//!
//! - **Configuration Errors**: invalid settings, patterns or group declarations.
//!   Raised before anything is written.
//! - **File Errors**: a staged sitemap file could not be created or written.
//!   Aborts the current group only.
//! - **Compression Errors**: gzip finalization of one closed file failed.
//!   Recorded and generation continues.
//! - **Source Errors**: the batch source of a group failed to deliver records.
//!   Aborts the current group only.
//! - **Publish Errors**: a delete or rename during publish failed. Recorded,
//!   never retried.
//!
//! ```rust
//! use sitemap_core::Error;
//!
//! let err = Error::Config("max_file_size: invalid size '12q'".to_string());
//! assert_eq!(err.category(), "config");
//! assert!(!err.is_recoverable());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for sitemap generation.
///
/// All fallible operations in this crate return `Result<T, Error>`. Variants
/// that concern a particular file carry its path so that reports can name the
/// file that was left behind.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed outside of a specific sitemap file.
    ///
    /// Covers directory listing and configuration file access.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is invalid.
    ///
    /// ## Common Causes
    ///
    /// - Malformed disallow pattern
    /// - Size string outside the `<digits>[k|m]` grammar
    /// - Base URL that is not an absolute http(s) URL
    /// - Two groups registered under the same name
    #[error("Configuration error: {0}")]
    Config(String),

    /// A staged sitemap file could not be created, written or closed.
    #[error("Failed to write '{}': {source}", path.display())]
    FileWrite {
        /// Staged path of the file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Gzip compression of a closed file failed.
    ///
    /// Either the source file could not be read or the `.gz` sibling could not
    /// be created. The uncompressed file is left in place.
    #[error("Failed to compress '{}': {source}", path.display())]
    Compression {
        /// Path of the file that was being compressed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The batch source of a group failed.
    #[error("Source error in group '{group}': {message}")]
    Source {
        /// Name of the group whose source failed.
        group: String,
        /// Description supplied by the source.
        message: String,
    },

    /// Deleting a published file or renaming a staged file failed.
    ///
    /// The output directory may be partially published when this is reported.
    #[error("Publish failed for '{}': {source}", path.display())]
    Publish {
        /// File that could not be deleted or renamed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might go away on a later run without changes.
    ///
    /// Transient I/O conditions (timeouts, interruptions) are recoverable;
    /// configuration problems never are. Publish failures are recoverable in the
    /// sense that the next successful run republishes everything.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e)
            | Self::FileWrite { source: e, .. }
            | Self::Compression { source: e, .. } => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Self::Publish { .. } | Self::Source { .. } => true,
            Self::Config(_) | Self::Serialization(_) => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful as a structured logging field:
    ///
    /// ```rust
    /// use sitemap_core::Error;
    ///
    /// let err = Error::Source { group: "pages".into(), message: "cursor closed".into() };
    /// tracing::warn!(category = err.category(), "{err}");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::FileWrite { .. } => "file_write",
            Self::Compression { .. } => "compression",
            Self::Source { .. } => "source",
            Self::Publish { .. } => "publish",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
