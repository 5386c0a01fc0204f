//! Batched record sources.
//!
//! A group's records come from a [`BatchSource`] that hands out at most
//! `batch_size` records per call and `None` once exhausted. The engine holds a
//! single batch at a time, so a source backed by a database cursor never has
//! to materialize the whole table.
//!
//! Anything the source needs to produce records (a connection, a query,
//! credentials) belongs to the source value itself.
//!
//! ```rust
//! use sitemap_core::{BatchSource, IterSource, UrlRecord};
//!
//! let mut source = IterSource::new((1..=250).map(|n| UrlRecord::new(format!("/p/{n}"))));
//!
//! assert_eq!(source.next_batch(100)?.map(|b| b.len()), Some(100));
//! assert_eq!(source.next_batch(100)?.map(|b| b.len()), Some(100));
//! assert_eq!(source.next_batch(100)?.map(|b| b.len()), Some(50));
//! assert!(source.next_batch(100)?.is_none());
//! # Ok::<(), sitemap_core::Error>(())
//! ```

use crate::Result;
use crate::record::SitemapRecord;

/// Number of records requested from a source per fetch.
pub const BATCH_SIZE: usize = 100;

/// A lazy, finite producer of record batches.
pub trait BatchSource {
    /// Record type produced by this source.
    type Record: SitemapRecord;

    /// Fetch up to `batch_size` records, or `None` when the source is done.
    ///
    /// Returning an empty batch is allowed and does not end the stream.
    fn next_batch(&mut self, batch_size: usize) -> Result<Option<Vec<Self::Record>>>;
}

/// Adapts any iterator of records into a [`BatchSource`].
#[derive(Debug)]
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator,
    I::Item: SitemapRecord,
{
    /// Wrap an iterator.
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I> BatchSource for IterSource<I>
where
    I: Iterator,
    I::Item: SitemapRecord,
{
    type Record = I::Item;

    fn next_batch(&mut self, batch_size: usize) -> Result<Option<Vec<Self::Record>>> {
        let batch: Vec<_> = self.iter.by_ref().take(batch_size.max(1)).collect();
        Ok((!batch.is_empty()).then_some(batch))
    }
}

/// A source driven by a closure, for fallible producers such as paginated
/// queries.
///
/// ```rust
/// use sitemap_core::{BatchSource, FnSource, UrlRecord};
///
/// let mut page = 0;
/// let mut source = FnSource::new(move |_batch_size| {
///     page += 1;
///     Ok((page <= 2).then(|| vec![UrlRecord::new(format!("/page/{page}"))]))
/// });
///
/// assert!(source.next_batch(100)?.is_some());
/// assert!(source.next_batch(100)?.is_some());
/// assert!(source.next_batch(100)?.is_none());
/// # Ok::<(), sitemap_core::Error>(())
/// ```
pub struct FnSource<F> {
    fetch: F,
}

impl<F, R> FnSource<F>
where
    F: FnMut(usize) -> Result<Option<Vec<R>>>,
    R: SitemapRecord,
{
    /// Wrap a fetch closure.
    pub const fn new(fetch: F) -> Self {
        Self { fetch }
    }
}

impl<F, R> BatchSource for FnSource<F>
where
    F: FnMut(usize) -> Result<Option<Vec<R>>>,
    R: SitemapRecord,
{
    type Record = R;

    fn next_batch(&mut self, batch_size: usize) -> Result<Option<Vec<R>>> {
        (self.fetch)(batch_size)
    }
}

/// Object-safe view of a [`BatchSource`] used by the generator to hold sources
/// of different record types side by side.
pub(crate) trait RecordStream {
    /// Pull batches until exhaustion, handing each record to `visit`.
    fn drain(
        &mut self,
        batch_size: usize,
        visit: &mut dyn FnMut(&dyn SitemapRecord) -> Result<()>,
    ) -> Result<()>;
}

impl<S: BatchSource> RecordStream for S {
    fn drain(
        &mut self,
        batch_size: usize,
        visit: &mut dyn FnMut(&dyn SitemapRecord) -> Result<()>,
    ) -> Result<()> {
        while let Some(batch) = self.next_batch(batch_size)? {
            for record in &batch {
                visit(record)?;
            }
        }
        Ok(())
    }
}
