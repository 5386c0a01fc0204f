//! URL exclusion by regular expression.
//!
//! Patterns are written either as bare regular expressions (`^https://example\.com/admin`)
//! or in the delimited form common in web configuration files
//! (`/^\/admin/i`). Delimited patterns may use `/`, `#` or `~` as delimiter and
//! take the trailing flags `i`, `m`, `s`, `x`, `u` and `U`.
//!
//! All patterns are compiled up front. An invalid pattern is a configuration
//! error, so a broken rule can never silently let a URL through.
//!
//! ```rust
//! use sitemap_core::DisallowFilter;
//!
//! let filter = DisallowFilter::new(&[r"/^\/admin/", r"\.pdf$"])?;
//! assert!(filter.is_disallowed("/admin/users"));
//! assert!(filter.is_disallowed("/files/report.pdf"));
//! assert!(!filter.is_disallowed("/home"));
//! # Ok::<(), sitemap_core::Error>(())
//! ```

use regex::{Regex, RegexBuilder};

use crate::{Error, Result};

const DELIMITERS: &[char] = &['/', '#', '~'];

/// A compiled set of exclusion rules, shared read-only across groups.
#[derive(Debug, Clone, Default)]
pub struct DisallowFilter {
    rules: Vec<Regex>,
}

impl DisallowFilter {
    /// Compile every pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| compile_rule(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// A filter that allows everything.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self { rules: Vec::new() }
    }

    /// True if any rule matches `url`.
    #[must_use]
    pub fn is_disallowed(&self, url: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(url))
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(pattern: &str) -> Result<Regex> {
    let compiled = match split_delimited(pattern) {
        Some((body, flags)) => {
            let mut builder = RegexBuilder::new(&body);
            for flag in flags.chars() {
                match flag {
                    'i' => builder.case_insensitive(true),
                    'm' => builder.multi_line(true),
                    's' => builder.dot_matches_new_line(true),
                    'x' => builder.ignore_whitespace(true),
                    'U' => builder.swap_greed(true),
                    // Patterns are always Unicode-aware.
                    _ => &mut builder,
                };
            }
            builder.build()
        },
        None => Regex::new(pattern),
    };

    compiled.map_err(|e| Error::Config(format!("Invalid disallow pattern '{pattern}': {e}")))
}

/// Split `/body/flags` into body and flags, unescaping the delimiter inside
/// the body. Returns `None` for bare patterns.
fn split_delimited(pattern: &str) -> Option<(String, &str)> {
    let delimiter = pattern.chars().next().filter(|c| DELIMITERS.contains(c))?;
    let close = pattern.rfind(delimiter).filter(|&idx| idx > 0)?;
    let flags = &pattern[close + 1..];
    if !flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'x' | 'u' | 'U')) {
        return None;
    }

    let raw = &pattern[1..close];
    let mut body = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next == delimiter => body.push(next),
                Some(next) => {
                    body.push('\\');
                    body.push(next);
                },
                None => body.push('\\'),
            }
        } else {
            body.push(c);
        }
    }

    Some((body, flags))
}
