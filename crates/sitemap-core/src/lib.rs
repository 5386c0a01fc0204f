//! # sitemap-core
//!
//! Batch generation of XML sitemaps for large sites.
//!
//! Records are pulled from named groups in batches, serialized into
//! `sitemap_<group>_<n>.xml` files that rotate on a URL count or byte size
//! limit, optionally gzipped, listed in a `sitemap.xml` index and then swapped
//! into place. Files are written under a staging name first, so crawlers never
//! see a half-written sitemap.
//!
//! ## Architecture
//!
//! - **Configuration**: TOML-backed run settings ([`SitemapConfig`])
//! - **Records and sources**: the [`SitemapRecord`] read contract and batched
//!   [`BatchSource`] producers
//! - **Serialization**: `<url>` fragments built by [`serialize_entry`]
//! - **Rotation**: limit checks ([`limiter`]) and per-group file rotation
//!   ([`rotation`]) on top of staged files ([`writer`])
//! - **Index and publishing**: [`build_index`] and the delete-then-rename
//!   [`Publisher`]
//! - **Error Handling**: one error enum with categories and recovery hints
//!
//! ## Quick Start
//!
//! ```rust
//! use sitemap_core::{IterSource, SitemapConfig, SitemapGenerator, UrlRecord};
//!
//! let dir = tempfile::tempdir()?;
//! let config = SitemapConfig::new(dir.path(), "https://example.com/sitemaps")
//!     .with_max_urls(2)
//!     .with_disallow_urls([r"^https://example\.com/admin"]);
//!
//! let pages = ["/", "/about", "/admin/users", "/contact"]
//!     .map(|path| UrlRecord::new(format!("https://example.com{path}")));
//!
//! let mut generator = SitemapGenerator::new(config)?;
//! generator.add_source("pages", IterSource::new(pages))?;
//! let report = generator.generate()?;
//!
//! assert_eq!(report.files, ["sitemap_pages_1.xml", "sitemap_pages_2.xml"]);
//! assert!(dir.path().join("sitemap.xml.gz").exists());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Configuration problems are reported before anything is written. During a
//! run, a failing group is rolled back without stopping the others, and
//! compression or publish failures are collected in
//! [`GenerationReport::issues`]:
//!
//! ```rust
//! use sitemap_core::{Error, SitemapConfig, SitemapGenerator};
//!
//! let config = SitemapConfig::new("out", "ftp://example.com");
//! match SitemapGenerator::new(config) {
//!     Err(Error::Config(msg)) => eprintln!("Bad configuration: {msg}"),
//!     Err(e) => eprintln!("Unexpected error: {e}"),
//!     Ok(_) => unreachable!("ftp base URLs are rejected"),
//! }
//! ```

/// Run configuration
pub mod config;
/// Error types and result aliases
pub mod error;
/// URL exclusion rules
pub mod filter;
/// Run orchestration
pub mod generator;
/// Sitemap index document
pub mod index;
/// Rotation limit checks
pub mod limiter;
/// Moving staged files into place
pub mod publish;
/// Record contract and optional attributes
pub mod record;
/// Per-group file rotation
pub mod rotation;
/// `<url>` fragment serialization
pub mod serializer;
/// Batched record sources
pub mod source;
/// Staged sitemap files and compression
pub mod writer;

// Re-export commonly used types
pub use config::{MaxFileSize, PublishMode, SitemapConfig};
pub use error::{Error, Result};
pub use filter::DisallowFilter;
pub use generator::{GenerationReport, GroupReport, SitemapGenerator};
pub use index::{GeneratedFileSet, build_index};
pub use limiter::Limits;
pub use publish::{PublishReport, Publisher};
pub use record::{OptionalAttribute, SitemapRecord, UrlRecord};
pub use rotation::GroupStats;
pub use serializer::serialize_entry;
pub use source::{BATCH_SIZE, BatchSource, FnSource, IterSource};
pub use writer::ClosedFile;
