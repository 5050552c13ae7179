/// A progress struct that can be used to track the progress of a data loader.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// The number of items that have been processed.
    pub items_processed: usize,

    /// The total number of items that need to be processed.
    pub items_total: usize,
}

/// A data loader iterator that can be used to iterate over a data loader.
pub trait DataLoaderIterator<O>: Iterator<Item = O> {
    /// Returns the progress of the data loader.
    fn progress(&self) -> Progress;
}

/// Settings a data loader was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Number of items per batch; the last batch of a pass may be smaller.
    pub batch_size: usize,
    /// Number of worker threads; zero loads batches on the iterating thread.
    pub num_workers: usize,
    /// Whether batches are meant to be staged in page-locked memory for accelerator transfer.
    pub pin_memory: bool,
    /// Whether items are reshuffled on every pass.
    pub shuffle: bool,
    /// Number of batches each worker prepares ahead of the consumer.
    pub prefetch_factor: usize,
}

/// A data loader that can be used to iterate over a dataset.
///
/// Every call to [iter](DataLoader::iter) starts a new pass over the data.
pub trait DataLoader<O>: Send + Sync {
    /// Returns a boxed [iterator](DataLoaderIterator) to iterate over the data loader.
    fn iter<'a>(&'a self) -> Box<dyn DataLoaderIterator<O> + 'a>;

    /// The number of items (not the number of batches nor the number of iterations),
    /// corresponding to the items_total of the progress returned by the iterator.
    fn num_items(&self) -> usize;

    /// The settings of the data loader.
    fn options(&self) -> LoaderOptions;

    /// The number of batches of a pass, the last one possibly partial.
    fn num_batches(&self) -> usize {
        self.num_items().div_ceil(self.options().batch_size.max(1))
    }
}
