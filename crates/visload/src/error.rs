use thiserror::Error;

use crate::data::dataset::DatasetError;

/// Error returned when building data loaders.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The dataset name is not one of the supported keys.
    #[error("unknown dataset `{0}`, expected one of: cifar100, cifar10, fashionMNIST")]
    UnknownDataset(String),

    /// Batches must hold at least one item.
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// The dataset could not be downloaded or read.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
