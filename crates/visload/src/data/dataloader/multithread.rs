use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use visload_dataset::Dataset;

use super::batch::pass_dataset;
use super::batcher::Batcher;
use super::{DataLoader, DataLoaderIterator, LoaderOptions, Progress};

/// Default number of batches each worker prepares ahead of the consumer.
pub const DEFAULT_PREFETCH_FACTOR: usize = 2;

/// A multi-threaded data loader that can be used to iterate over a dataset.
///
/// Worker `w` of `n` builds batches `w`, `w + n`, `w + 2n`, ... of a pass and sends them over
/// its own bounded channel. The iterator reads batch `k` from worker `k % n`, so batches
/// come out in the same order as with a single thread.
pub struct MultiThreadDataLoader<I, O> {
    dataset: Arc<dyn Dataset<I>>,
    batcher: Arc<dyn Batcher<I, O>>,
    batch_size: usize,
    num_threads: usize,
    prefetch_factor: usize,
    rng: Option<Mutex<StdRng>>,
    pin_memory: bool,
}

impl<I, O> MultiThreadDataLoader<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    /// Creates a new multi-threaded batch data loader.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - The number of items of a full batch.
    /// * `dataset` - The dataset.
    /// * `batcher` - The batcher.
    /// * `num_threads` - The number of threads, at least one.
    /// * `rng` - The rng determining the order of each pass, `None` to keep the dataset order.
    ///
    /// # Returns
    ///
    /// The multi-threaded batch data loader.
    pub fn new(
        batch_size: usize,
        dataset: Arc<dyn Dataset<I>>,
        batcher: Arc<dyn Batcher<I, O>>,
        num_threads: usize,
        rng: Option<StdRng>,
    ) -> Self {
        Self {
            dataset,
            batcher,
            batch_size: batch_size.max(1),
            num_threads: num_threads.max(1),
            prefetch_factor: DEFAULT_PREFETCH_FACTOR,
            rng: rng.map(Mutex::new),
            pin_memory: false,
        }
    }

    /// Sets the number of batches each worker prepares ahead of the consumer.
    pub fn with_prefetch_factor(mut self, prefetch_factor: usize) -> Self {
        self.prefetch_factor = prefetch_factor.max(1);
        self
    }

    /// Marks the loader as producing batches for pinned memory.
    pub fn with_pin_memory(mut self, pin_memory: bool) -> Self {
        self.pin_memory = pin_memory;
        self
    }
}

impl<I, O> DataLoader<O> for MultiThreadDataLoader<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn iter<'a>(&'a self) -> Box<dyn DataLoaderIterator<O> + 'a> {
        let dataset = pass_dataset(&self.dataset, self.rng.as_ref());
        let num_items = dataset.len();
        let num_batches = num_items.div_ceil(self.batch_size);

        let mut receivers = Vec::with_capacity(self.num_threads);
        let mut workers = Vec::with_capacity(self.num_threads);

        for worker in 0..self.num_threads.min(num_batches) {
            let (sender, receiver) = mpsc::sync_channel::<O>(self.prefetch_factor);
            let dataset = dataset.clone();
            let batcher = self.batcher.clone();
            let batch_size = self.batch_size;
            let step = self.num_threads;

            let handle = thread::spawn(move || {
                for index in (worker..num_batches).step_by(step) {
                    let start = index * batch_size;
                    let end = usize::min(start + batch_size, num_items);
                    let items = (start..end).filter_map(|i| dataset.get(i)).collect();

                    if sender.send(batcher.batch(items)).is_err() {
                        // The iterator was dropped before the end of the pass.
                        log::debug!("Worker {worker} stopped at batch {index}");
                        return;
                    }
                }
            });

            receivers.push(receiver);
            workers.push(Some(handle));
        }

        Box::new(MultiThreadsDataloaderIterator {
            current_batch: 0,
            num_batches,
            num_items,
            batch_size: self.batch_size,
            receivers,
            workers,
        })
    }

    fn num_items(&self) -> usize {
        self.dataset.len()
    }

    fn options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size: self.batch_size,
            num_workers: self.num_threads,
            pin_memory: self.pin_memory,
            shuffle: self.rng.is_some(),
            prefetch_factor: self.prefetch_factor,
        }
    }
}

struct MultiThreadsDataloaderIterator<O> {
    current_batch: usize,
    num_batches: usize,
    num_items: usize,
    batch_size: usize,
    receivers: Vec<mpsc::Receiver<O>>,
    workers: Vec<Option<thread::JoinHandle<()>>>,
}

impl<O> MultiThreadsDataloaderIterator<O> {
    /// Joins a worker that is done sending, re-raising its panic if it failed.
    fn join_worker(&mut self, worker: usize) {
        if let Some(handle) = self.workers.get_mut(worker).and_then(Option::take) {
            if let Err(panic) = handle.join() {
                std::panic::resume_unwind(panic);
            }
        }
    }
}

impl<O> Iterator for MultiThreadsDataloaderIterator<O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        if self.current_batch >= self.num_batches || self.receivers.is_empty() {
            // Every batch was received, so every worker is done.
            for worker in 0..self.workers.len() {
                self.join_worker(worker);
            }
            return None;
        }

        let worker = self.current_batch % self.receivers.len();
        match self.receivers[worker].recv() {
            Ok(batch) => {
                self.current_batch += 1;
                Some(batch)
            }
            Err(_) => {
                // The worker hung up without sending its batch, so it panicked.
                self.join_worker(worker);
                self.current_batch = self.num_batches;
                None
            }
        }
    }
}

impl<O> DataLoaderIterator<O> for MultiThreadsDataloaderIterator<O> {
    fn progress(&self) -> Progress {
        let items_processed = usize::min(self.current_batch * self.batch_size, self.num_items);
        Progress::new(items_processed, self.num_items)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use visload_dataset::InMemDataset;

    use super::*;
    use crate::data::dataloader::batcher::TestBatcher;
    use crate::data::dataloader::{BatchDataLoader, FixBatchStrategy};

    fn dataset(size: usize) -> Arc<dyn Dataset<usize>> {
        Arc::new(InMemDataset::new((0..size).collect::<Vec<_>>()))
    }

    #[test]
    fn test_multi_thread_batch_dataloader() {
        let dataloader_single_thread = BatchDataLoader::new(
            Box::new(FixBatchStrategy::new(5)),
            dataset(27),
            Arc::new(TestBatcher::new()),
            None,
        );
        let dataloader_multi_thread =
            MultiThreadDataLoader::new(5, dataset(27), Arc::new(TestBatcher::new()), 4, None);

        let single: Vec<Vec<usize>> = dataloader_single_thread.iter().collect();
        let multi: Vec<Vec<usize>> = dataloader_multi_thread.iter().collect();

        assert_eq!(single, multi);
        assert_eq!(multi.len(), dataloader_multi_thread.num_batches());
    }

    #[test]
    fn shuffled_passes_cover_every_item() {
        let dataloader = MultiThreadDataLoader::new(
            4,
            dataset(30),
            Arc::new(TestBatcher::new()),
            3,
            Some(StdRng::seed_from_u64(1)),
        );

        let first: Vec<usize> = dataloader.iter().flatten().collect();
        let second: Vec<usize> = dataloader.iter().flatten().collect();

        assert_ne!(first, second);
        assert_eq!(first.len(), 30);
        assert_eq!(first.into_iter().collect::<HashSet<_>>().len(), 30);
    }

    #[test]
    fn more_workers_than_batches() {
        let dataloader =
            MultiThreadDataLoader::new(8, dataset(10), Arc::new(TestBatcher::new()), 6, None);
        let mut iterator = dataloader.iter();

        assert_eq!(iterator.next(), Some((0..8).collect()));
        assert_eq!(iterator.next(), Some(vec![8, 9]));
        assert_eq!(iterator.progress(), Progress::new(10, 10));
        assert_eq!(iterator.next(), None);
    }

    #[test]
    fn dropping_the_iterator_early_stops_the_workers() {
        let dataloader =
            MultiThreadDataLoader::new(1, dataset(100), Arc::new(TestBatcher::new()), 2, None);

        let first = dataloader.iter().next();

        assert_eq!(first, Some(vec![0]));
        assert_eq!(dataloader.iter().count(), 100);
    }

    struct PanickingBatcher;

    impl Batcher<usize, usize> for PanickingBatcher {
        fn batch(&self, items: Vec<usize>) -> usize {
            if items.contains(&5) {
                panic!("corrupted item");
            }
            items.len()
        }
    }

    #[test]
    #[should_panic(expected = "corrupted item")]
    fn worker_panics_are_propagated() {
        let dataloader =
            MultiThreadDataLoader::new(1, dataset(10), Arc::new(PanickingBatcher), 2, None);

        for _ in dataloader.iter() {}
    }
}
