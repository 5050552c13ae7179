mod recipes;

pub use recipes::*;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::data::dataloader::{DataLoader, DataLoaderBuilder};
use crate::data::dataset::transform::{MapperDataset, RngSource};
use crate::data::dataset::vision::{
    Cifar100Dataset, Cifar10Dataset, FashionMnistDataset, ImageItem,
};
use crate::data::dataset::{Dataset, DatasetStorage};
use crate::vision::transform::Compose;
use crate::vision::Preprocess;
use crate::{ClassificationBatch, ClassificationBatcher, Device, LoaderConfig, LoaderError, Pipeline};

/// Data loader of classification batches.
pub type ClassificationLoader = Arc<dyn DataLoader<ClassificationBatch>>;

/// Train and test loaders of a dataset.
pub type LoaderPair = (ClassificationLoader, ClassificationLoader);

// Offsets added to the configured seed, one per random stream.
const TRAIN_SHUFFLE_STREAM: u64 = 0;
const TRAIN_AUGMENTATION_STREAM: u64 = 1;

/// Supported datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetName {
    /// CIFAR-100, key `cifar100`.
    Cifar100,
    /// CIFAR-10, key `cifar10`.
    Cifar10,
    /// Fashion-MNIST, key `fashionMNIST`.
    FashionMnist,
}

impl DatasetName {
    /// Every supported dataset.
    pub const ALL: [DatasetName; 3] = [
        DatasetName::Cifar100,
        DatasetName::Cifar10,
        DatasetName::FashionMnist,
    ];

    /// Key selecting the dataset.
    pub fn key(&self) -> &'static str {
        match self {
            DatasetName::Cifar100 => "cifar100",
            DatasetName::Cifar10 => "cifar10",
            DatasetName::FashionMnist => "fashionMNIST",
        }
    }

    /// Number of classes of the dataset.
    pub fn num_classes(&self) -> usize {
        match self {
            DatasetName::Cifar100 => 100,
            DatasetName::Cifar10 | DatasetName::FashionMnist => 10,
        }
    }
}

impl FromStr for DatasetName {
    type Err = LoaderError;

    /// Keys are case sensitive.
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        DatasetName::ALL
            .into_iter()
            .find(|name| name.key() == key)
            .ok_or_else(|| LoaderError::UnknownDataset(key.to_string()))
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Loader settings of one split.
#[derive(Debug, Clone, Copy)]
struct SplitOptions {
    shuffle: bool,
    num_workers: usize,
    pin_memory: bool,
}

/// Builds the train and test loaders of the supported datasets.
///
/// Raw files are read from, and downloaded into, the [storage](DatasetStorage).
#[derive(Debug, Clone)]
pub struct DatasetLoaders {
    config: LoaderConfig,
    storage: DatasetStorage,
}

impl DatasetLoaders {
    /// Creates loaders downloading over HTTP into the configured data directory.
    #[cfg(feature = "network")]
    pub fn new(config: LoaderConfig) -> Self {
        let storage = DatasetStorage::http(config.data_dir.clone());
        Self::with_storage(config, storage)
    }

    /// Creates loaders reading raw files from `storage`.
    ///
    /// The download flag of the configuration replaces the one of the storage.
    pub fn with_storage(config: LoaderConfig, storage: DatasetStorage) -> Self {
        let storage = storage.with_download(config.download);
        Self { config, storage }
    }

    /// The configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The raw file storage.
    pub fn storage(&self) -> &DatasetStorage {
        &self.storage
    }

    /// Builds the loaders of the dataset named `dataset_name`.
    ///
    /// # Arguments
    ///
    /// * `dataset_name` - One of `cifar100`, `cifar10` or `fashionMNIST`.
    /// * `preprocess` - Final stage of the image pipelines.
    /// * `batch_size` - Number of items per batch.
    /// * `device` - Device tag, such as `cuda`, `mps` or `cpu`.
    ///
    /// # Returns
    ///
    /// The train and test loaders, or [LoaderError::UnknownDataset] without any side effect
    /// when the name is not supported.
    pub fn load(
        &self,
        dataset_name: &str,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
        device: &str,
    ) -> Result<LoaderPair, LoaderError> {
        let name = dataset_name.parse::<DatasetName>()?;
        self.build(name, preprocess, batch_size, &Device::from(device))
    }

    /// Builds the loaders of `name`.
    pub fn build(
        &self,
        name: DatasetName,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
        device: &Device,
    ) -> Result<LoaderPair, LoaderError> {
        match name {
            DatasetName::Cifar100 => self.cifar100(preprocess, batch_size, device),
            DatasetName::Cifar10 => self.cifar10(preprocess, batch_size, device),
            DatasetName::FashionMnist => self.fashion_mnist(preprocess, batch_size, device),
        }
    }

    /// CIFAR-100 loaders.
    ///
    /// Training images go through the [CIFAR-100 augmentation](cifar100_augmentation) before
    /// `preprocess`; test images only through `preprocess`. Both loaders use two workers and
    /// pinned memory on `cuda`, one worker otherwise.
    pub fn cifar100(
        &self,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
        device: &Device,
    ) -> Result<LoaderPair, LoaderError> {
        check_batch_size(batch_size)?;

        let (num_workers, pin_memory) = if device.is_cuda() { (2, true) } else { (1, false) };

        let train = Cifar100Dataset::train(&self.storage)?;
        let test = Cifar100Dataset::test(&self.storage)?;
        log::info!(
            "CIFAR-100 loaders for {device}: {} train and {} test images, batch size {batch_size}, \
             {num_workers} workers, pin memory {pin_memory}",
            train.len(),
            test.len(),
        );

        let train_pipeline = Pipeline::new(
            cifar100_augmentation(),
            preprocess.clone(),
            self.rng_source(TRAIN_AUGMENTATION_STREAM),
        );
        let test_pipeline = Pipeline::preprocess_only(preprocess);

        Ok((
            self.split_loader(
                train,
                train_pipeline,
                batch_size,
                SplitOptions {
                    shuffle: true,
                    num_workers,
                    pin_memory,
                },
            ),
            self.split_loader(
                test,
                test_pipeline,
                batch_size,
                SplitOptions {
                    shuffle: false,
                    num_workers,
                    pin_memory,
                },
            ),
        ))
    }

    /// CIFAR-10 loaders, `preprocess` only, loaded on the iterating thread.
    pub fn cifar10(
        &self,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
        device: &Device,
    ) -> Result<LoaderPair, LoaderError> {
        check_batch_size(batch_size)?;

        let train = Cifar10Dataset::train(&self.storage)?;
        let test = Cifar10Dataset::test(&self.storage)?;
        log::info!(
            "CIFAR-10 loaders for {device}: {} train and {} test images, batch size {batch_size}",
            train.len(),
            test.len(),
        );

        Ok(self.in_thread_loaders(
            train,
            test,
            Compose::default(),
            Compose::default(),
            preprocess,
            batch_size,
        ))
    }

    /// Fashion-MNIST loaders, loaded on the iterating thread.
    ///
    /// Both splits are converted to three channel grayscale before `preprocess`.
    pub fn fashion_mnist(
        &self,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
        device: &Device,
    ) -> Result<LoaderPair, LoaderError> {
        check_batch_size(batch_size)?;

        let train = FashionMnistDataset::train(&self.storage)?;
        let test = FashionMnistDataset::test(&self.storage)?;
        log::info!(
            "Fashion-MNIST loaders for {device}: {} train and {} test images, batch size {batch_size}",
            train.len(),
            test.len(),
        );

        Ok(self.in_thread_loaders(
            train,
            test,
            fashion_mnist_transform(),
            fashion_mnist_transform(),
            preprocess,
            batch_size,
        ))
    }

    fn in_thread_loaders<D>(
        &self,
        train: D,
        test: D,
        train_transform: Compose,
        test_transform: Compose,
        preprocess: Arc<dyn Preprocess>,
        batch_size: usize,
    ) -> LoaderPair
    where
        D: Dataset<ImageItem> + 'static,
    {
        let options = |shuffle| SplitOptions {
            shuffle,
            num_workers: 0,
            pin_memory: false,
        };
        let train_pipeline = Pipeline::new(
            train_transform,
            preprocess.clone(),
            self.rng_source(TRAIN_AUGMENTATION_STREAM),
        );
        let test_pipeline = Pipeline::new(test_transform, preprocess, RngSource::Seed(0));

        (
            self.split_loader(train, train_pipeline, batch_size, options(true)),
            self.split_loader(test, test_pipeline, batch_size, options(false)),
        )
    }

    fn split_loader<D>(
        &self,
        dataset: D,
        pipeline: Pipeline,
        batch_size: usize,
        options: SplitOptions,
    ) -> ClassificationLoader
    where
        D: Dataset<ImageItem> + 'static,
    {
        let mut builder = DataLoaderBuilder::new(ClassificationBatcher)
            .batch_size(batch_size)
            .num_workers(options.num_workers)
            .prefetch_factor(self.config.prefetch_factor)
            .pin_memory(options.pin_memory);

        if options.shuffle {
            builder = builder.shuffle(self.rng_source(TRAIN_SHUFFLE_STREAM));
        }

        builder.build(MapperDataset::new(dataset, pipeline))
    }

    fn rng_source(&self, stream: u64) -> RngSource {
        match self.config.seed {
            Some(seed) => RngSource::Seed(seed.wrapping_add(stream)),
            None => RngSource::Default,
        }
    }
}

fn check_batch_size(batch_size: usize) -> Result<(), LoaderError> {
    if batch_size == 0 {
        return Err(LoaderError::InvalidBatchSize);
    }
    Ok(())
}

/// Builds the train and test loaders of `dataset_name` with the default
/// [configuration](LoaderConfig), downloading missing files into its data directory.
///
/// # Arguments
///
/// * `dataset_name` - One of `cifar100`, `cifar10` or `fashionMNIST`.
/// * `preprocess` - Final stage of the image pipelines.
/// * `batch_size` - Number of items per batch.
/// * `device` - Device tag, such as `cuda`, `mps` or `cpu`.
#[cfg(feature = "network")]
pub fn loader(
    dataset_name: &str,
    preprocess: Arc<dyn Preprocess>,
    batch_size: usize,
    device: &str,
) -> Result<LoaderPair, LoaderError> {
    DatasetLoaders::new(LoaderConfig::default()).load(dataset_name, preprocess, batch_size, device)
}
