use crate::DatasetResult;

/// Source of raw dataset files.
///
/// The [storage](crate::DatasetStorage) only calls the fetcher on a cache miss, which
/// makes it the natural seam to observe or replace network access.
pub trait Fetcher: Send + Sync {
    /// Fetches the content located at `url`.
    ///
    /// `name` is a short human readable label for progress reporting.
    fn fetch(&self, url: &str, name: &str) -> DatasetResult<Vec<u8>>;
}
