use std::sync::Arc;

use rand::rngs::StdRng;
use visload_dataset::transform::RngSource;
use visload_dataset::Dataset;

use super::batcher::Batcher;
use super::{
    BatchDataLoader, DataLoader, FixBatchStrategy, MultiThreadDataLoader, DEFAULT_PREFETCH_FACTOR,
};

/// A builder for data loaders.
pub struct DataLoaderBuilder<I, O> {
    batcher: Arc<dyn Batcher<I, O>>,
    batch_size: Option<usize>,
    num_threads: Option<usize>,
    shuffle: Option<RngSource>,
    pin_memory: bool,
    prefetch_factor: usize,
}

impl<I, O> DataLoaderBuilder<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates a new data loader builder.
    ///
    /// # Arguments
    ///
    /// * `batcher` - The batcher.
    ///
    /// # Returns
    ///
    /// The data loader builder.
    pub fn new<B>(batcher: B) -> Self
    where
        B: Batcher<I, O> + 'static,
    {
        Self {
            batcher: Arc::new(batcher),
            batch_size: None,
            num_threads: None,
            shuffle: None,
            pin_memory: false,
            prefetch_factor: DEFAULT_PREFETCH_FACTOR,
        }
    }

    /// Sets the batch size to a fix number. The [fix batch strategy](FixBatchStrategy)
    /// will be used.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - The batch size.
    ///
    /// # Returns
    ///
    /// The data loader builder.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Reshuffles the dataset on every pass.
    ///
    /// # Arguments
    ///
    /// * `rng` - A seed, an rng or [RngSource::Default] for an unseeded shuffle.
    ///
    /// # Returns
    ///
    /// The data loader builder.
    pub fn shuffle<R: Into<RngSource>>(mut self, rng: R) -> Self {
        self.shuffle = Some(rng.into());
        self
    }

    /// Sets the number of workers. Zero builds batches on the iterating thread.
    ///
    /// # Arguments
    ///
    /// * `num_workers` - The number of workers.
    ///
    /// # Returns
    ///
    /// The data loader builder.
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_threads = Some(num_workers);
        self
    }

    /// Sets the number of batches each worker prepares ahead of the consumer.
    pub fn prefetch_factor(mut self, prefetch_factor: usize) -> Self {
        self.prefetch_factor = prefetch_factor;
        self
    }

    /// Marks the batches as meant for page-locked memory.
    pub fn pin_memory(mut self, pin_memory: bool) -> Self {
        self.pin_memory = pin_memory;
        self
    }

    /// Builds the data loader.
    ///
    /// # Arguments
    ///
    /// * `dataset` - The dataset.
    ///
    /// # Returns
    ///
    /// The data loader.
    pub fn build<D>(self, dataset: D) -> Arc<dyn DataLoader<O>>
    where
        D: Dataset<I> + 'static,
    {
        let dataset: Arc<dyn Dataset<I>> = Arc::new(dataset);
        let batch_size = self.batch_size.unwrap_or(1);
        let rng = self.shuffle.map(StdRng::from);

        match self.num_threads {
            Some(num_threads) if num_threads > 0 => Arc::new(
                MultiThreadDataLoader::new(batch_size, dataset, self.batcher, num_threads, rng)
                    .with_prefetch_factor(self.prefetch_factor)
                    .with_pin_memory(self.pin_memory),
            ),
            _ => Arc::new(
                BatchDataLoader::new(
                    Box::new(FixBatchStrategy::new(batch_size)),
                    dataset,
                    self.batcher,
                    rng,
                )
                .with_pin_memory(self.pin_memory),
            ),
        }
    }
}
