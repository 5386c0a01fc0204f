//! The read contract for entities written into a sitemap.
//!
//! Any domain type can appear in a sitemap by implementing [`SitemapRecord`].
//! Only the location is required; every optional attribute defaults to absent.
//! Which optional attributes are emitted, and in which order, is decided by the
//! configured list of [`OptionalAttribute`] values rather than by the record.
//!
//! ```rust
//! use std::borrow::Cow;
//! use sitemap_core::{OptionalAttribute, SitemapRecord};
//!
//! struct Article {
//!     slug: String,
//!     updated: String,
//! }
//!
//! impl SitemapRecord for Article {
//!     fn loc(&self) -> Cow<'_, str> {
//!         Cow::Owned(format!("https://example.com/articles/{}", self.slug))
//!     }
//!
//!     fn lastmod(&self) -> Option<Cow<'_, str>> {
//!         Some(Cow::Borrowed(&self.updated))
//!     }
//! }
//!
//! let article = Article { slug: "rust".into(), updated: "2024-05-01".into() };
//! assert_eq!(OptionalAttribute::Lastmod.value(&article).as_deref(), Some("2024-05-01"));
//! assert_eq!(OptionalAttribute::Priority.value(&article), None);
//! ```

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Read access to one URL entry.
///
/// Values are borrowed for the duration of serialization only. An optional
/// attribute that returns `None` or an empty string is omitted from the output.
pub trait SitemapRecord {
    /// Location of the page. Must not be empty.
    fn loc(&self) -> Cow<'_, str>;

    /// Last modification date, already formatted for the sitemap.
    fn lastmod(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Change frequency hint (`daily`, `weekly`, ...).
    fn changefreq(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Priority relative to other URLs of the site.
    fn priority(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Inner markup of the `<image:image>` element.
    fn image(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Inner markup of the `<video:video>` element.
    fn video(&self) -> Option<Cow<'_, str>> {
        None
    }
}

impl<T: SitemapRecord + ?Sized> SitemapRecord for &T {
    fn loc(&self) -> Cow<'_, str> {
        (**self).loc()
    }

    fn lastmod(&self) -> Option<Cow<'_, str>> {
        (**self).lastmod()
    }

    fn changefreq(&self) -> Option<Cow<'_, str>> {
        (**self).changefreq()
    }

    fn priority(&self) -> Option<Cow<'_, str>> {
        (**self).priority()
    }

    fn image(&self) -> Option<Cow<'_, str>> {
        (**self).image()
    }

    fn video(&self) -> Option<Cow<'_, str>> {
        (**self).video()
    }
}

/// Optional sitemap attributes that can follow `<loc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionalAttribute {
    /// `<changefreq>`
    Changefreq,
    /// `<lastmod>`
    Lastmod,
    /// `<priority>`
    Priority,
    /// `<image:image>`
    Image,
    /// `<video:video>`
    Video,
}

impl OptionalAttribute {
    /// Every attribute, in the default emission order.
    pub const ALL: [Self; 5] = [
        Self::Changefreq,
        Self::Lastmod,
        Self::Priority,
        Self::Image,
        Self::Video,
    ];

    /// Element name used in the sitemap. Image and video live in their
    /// extension namespaces.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Changefreq => "changefreq",
            Self::Lastmod => "lastmod",
            Self::Priority => "priority",
            Self::Image => "image:image",
            Self::Video => "video:video",
        }
    }

    /// Whether the value is element content that must be written verbatim
    /// rather than escaped as text.
    #[must_use]
    pub const fn is_markup(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Read this attribute from a record. Empty values read as absent.
    pub fn value<'r, R: SitemapRecord + ?Sized>(self, record: &'r R) -> Option<Cow<'r, str>> {
        let value = match self {
            Self::Changefreq => record.changefreq(),
            Self::Lastmod => record.lastmod(),
            Self::Priority => record.priority(),
            Self::Image => record.image(),
            Self::Video => record.video(),
        };
        value.filter(|v| !v.is_empty())
    }
}

impl fmt::Display for OptionalAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Changefreq => "changefreq",
            Self::Lastmod => "lastmod",
            Self::Priority => "priority",
            Self::Image => "image",
            Self::Video => "video",
        };
        f.write_str(name)
    }
}

/// An owned URL entry for callers without a domain type of their own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlRecord {
    /// Page location.
    pub loc: String,
    /// `<lastmod>` value.
    pub lastmod: Option<String>,
    /// `<changefreq>` value.
    pub changefreq: Option<String>,
    /// `<priority>` value.
    pub priority: Option<String>,
    /// `<image:image>` inner markup.
    pub image: Option<String>,
    /// `<video:video>` inner markup.
    pub video: Option<String>,
}

impl UrlRecord {
    /// Create a record with only a location.
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            ..Self::default()
        }
    }

    /// Set the last modification date.
    #[must_use]
    pub fn with_lastmod(mut self, lastmod: impl Into<String>) -> Self {
        self.lastmod = Some(lastmod.into());
        self
    }

    /// Set the change frequency.
    #[must_use]
    pub fn with_changefreq(mut self, changefreq: impl Into<String>) -> Self {
        self.changefreq = Some(changefreq.into());
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the image markup.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the video markup.
    #[must_use]
    pub fn with_video(mut self, video: impl Into<String>) -> Self {
        self.video = Some(video.into());
        self
    }
}

impl SitemapRecord for UrlRecord {
    fn loc(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.loc)
    }

    fn lastmod(&self) -> Option<Cow<'_, str>> {
        self.lastmod.as_deref().map(Cow::Borrowed)
    }

    fn changefreq(&self) -> Option<Cow<'_, str>> {
        self.changefreq.as_deref().map(Cow::Borrowed)
    }

    fn priority(&self) -> Option<Cow<'_, str>> {
        self.priority.as_deref().map(Cow::Borrowed)
    }

    fn image(&self) -> Option<Cow<'_, str>> {
        self.image.as_deref().map(Cow::Borrowed)
    }

    fn video(&self) -> Option<Cow<'_, str>> {
        self.video.as_deref().map(Cow::Borrowed)
    }
}
