use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::Rng;
use visload_dataset::transform::ShuffledDataset;
use visload_dataset::Dataset;

use super::batcher::Batcher;
use super::{BatchStrategy, DataLoader, DataLoaderIterator, LoaderOptions, Progress};

/// A data loader building batches on the iterating thread.
pub struct BatchDataLoader<I, O> {
    strategy: Box<dyn BatchStrategy<I>>,
    dataset: Arc<dyn Dataset<I>>,
    batcher: Arc<dyn Batcher<I, O>>,
    rng: Option<Mutex<StdRng>>,
    pin_memory: bool,
}

impl<I, O> BatchDataLoader<I, O>
where
    I: Send + Sync + 'static,
{
    /// Creates a new batch data loader.
    ///
    /// # Arguments
    ///
    /// * `strategy` - The batch strategy.
    /// * `dataset` - The dataset.
    /// * `batcher` - The batcher.
    /// * `rng` - The rng determining the order of each pass, `None` to keep the dataset order.
    ///
    /// # Returns
    ///
    /// The batch data loader.
    pub fn new(
        strategy: Box<dyn BatchStrategy<I>>,
        dataset: Arc<dyn Dataset<I>>,
        batcher: Arc<dyn Batcher<I, O>>,
        rng: Option<StdRng>,
    ) -> Self {
        Self {
            strategy,
            dataset,
            batcher,
            rng: rng.map(Mutex::new),
            pin_memory: false,
        }
    }

    /// Marks the loader as producing batches for pinned memory.
    pub fn with_pin_memory(mut self, pin_memory: bool) -> Self {
        self.pin_memory = pin_memory;
        self
    }
}

/// The items of a pass, reshuffled with a seed drawn from `rng` when present.
pub(crate) fn pass_dataset<I>(
    dataset: &Arc<dyn Dataset<I>>,
    rng: Option<&Mutex<StdRng>>,
) -> Arc<dyn Dataset<I>>
where
    I: Send + Sync + 'static,
{
    match rng {
        Some(rng) => {
            let seed: u64 = rng.lock().unwrap_or_else(PoisonError::into_inner).random();
            log::debug!("Shuffling {} items with seed {seed}", dataset.len());
            Arc::new(ShuffledDataset::new(dataset.clone(), seed))
        }
        None => dataset.clone(),
    }
}

/// A data loader iterator that can be used to iterate over a data loader.
struct BatchDataloaderIterator<I, O> {
    current_index: usize,
    strategy: Box<dyn BatchStrategy<I>>,
    dataset: Arc<dyn Dataset<I>>,
    batcher: Arc<dyn Batcher<I, O>>,
}

impl<I, O> DataLoader<O> for BatchDataLoader<I, O>
where
    I: Send + Sync + 'static,
    O: Send,
{
    fn iter<'a>(&'a self) -> Box<dyn DataLoaderIterator<O> + 'a> {
        Box::new(BatchDataloaderIterator::new(
            self.strategy.clone_dyn(),
            pass_dataset(&self.dataset, self.rng.as_ref()),
            self.batcher.clone(),
        ))
    }

    fn num_items(&self) -> usize {
        self.dataset.len()
    }

    fn options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size: self.strategy.batch_size(),
            num_workers: 0,
            pin_memory: self.pin_memory,
            shuffle: self.rng.is_some(),
            prefetch_factor: 0,
        }
    }
}

impl<I, O> BatchDataloaderIterator<I, O> {
    /// Creates a new batch data loader iterator.
    ///
    /// # Arguments
    ///
    /// * `strategy` - The batch strategy.
    /// * `dataset` - The dataset.
    /// * `batcher` - The batcher.
    ///
    /// # Returns
    ///
    /// The batch data loader iterator.
    pub fn new(
        strategy: Box<dyn BatchStrategy<I>>,
        dataset: Arc<dyn Dataset<I>>,
        batcher: Arc<dyn Batcher<I, O>>,
    ) -> Self {
        BatchDataloaderIterator {
            current_index: 0,
            strategy,
            dataset,
            batcher,
        }
    }
}

impl<I, O> Iterator for BatchDataloaderIterator<I, O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        while let Some(item) = self.dataset.get(self.current_index) {
            self.current_index += 1;
            self.strategy.add(item);

            if let Some(items) = self.strategy.batch(false) {
                return Some(self.batcher.batch(items));
            }
        }

        if let Some(items) = self.strategy.batch(true) {
            return Some(self.batcher.batch(items));
        }

        None
    }
}

impl<I, O> DataLoaderIterator<O> for BatchDataloaderIterator<I, O> {
    fn progress(&self) -> Progress {
        Progress::new(self.current_index, self.dataset.len())
    }
}
