//! Serialization of one record into a `<url>` fragment.
//!
//! Every fragment starts on a new line so that consecutive fragments and the
//! closing `</urlset>` tag each begin on their own line:
//!
//! ```text
//!
//! <url>
//! 	<loc>https://example.com/a</loc>
//! 	<lastmod>2024-01-01</lastmod>
//! </url>
//! ```

use quick_xml::escape::escape;

use crate::record::{OptionalAttribute, SitemapRecord};

/// Serialize `record` with the optional attributes in `attributes` order.
///
/// `<loc>` is always written. Optional attributes are written only when the
/// record supplies a non-empty value. Text values are XML-escaped; image and
/// video values are element content and pass through unchanged.
///
/// ```rust
/// use sitemap_core::{OptionalAttribute, UrlRecord, serialize_entry};
///
/// let record = UrlRecord::new("https://example.com/?a=1&b=2").with_priority("0.5");
/// let xml = serialize_entry(&record, &[OptionalAttribute::Lastmod, OptionalAttribute::Priority]);
///
/// assert_eq!(
///     xml,
///     "\n<url>\n\t<loc>https://example.com/?a=1&amp;b=2</loc>\n\t<priority>0.5</priority>\n</url>"
/// );
/// ```
pub fn serialize_entry<R: SitemapRecord + ?Sized>(
    record: &R,
    attributes: &[OptionalAttribute],
) -> String {
    let loc = record.loc();
    let mut out = String::with_capacity(loc.len() + 64);

    out.push_str("\n<url>\n");
    push_element(&mut out, "loc", &escape(loc.as_ref()));

    for &attribute in attributes {
        if let Some(value) = attribute.value(record) {
            if attribute.is_markup() {
                push_element(&mut out, attribute.tag(), &value);
            } else {
                push_element(&mut out, attribute.tag(), &escape(value.as_ref()));
            }
        }
    }

    out.push_str("</url>");
    out
}

fn push_element(out: &mut String, tag: &str, value: &str) {
    out.push('\t');
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(value);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}
