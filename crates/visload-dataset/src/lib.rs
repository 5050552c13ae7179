#![warn(missing_docs)]

//! # Visload Dataset
//!
//! Image classification datasets, downloaded once and served from an on-disk cache.
//!
//! The [Dataset] trait is the central abstraction: a fixed-size collection of items
//! accessed by index. Transformations such as [mapping](transform::MapperDataset) and
//! [shuffling](transform::ShuffledDataset) wrap a dataset without copying its items.
//!
//! The [vision] module ships readers for CIFAR-10, CIFAR-100 and Fashion-MNIST. Their raw
//! files are fetched through a [DatasetStorage], which owns the cache directory and the
//! [Fetcher](network::Fetcher) used on a cache miss.

#[macro_use]
extern crate derive_new;

/// Dataset transformations.
pub mod transform;

/// Vision datasets.
pub mod vision;

/// Network utilities to fetch raw dataset files.
pub mod network;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

mod dataset;
mod error;
mod storage;

pub use dataset::*;
pub use error::*;
pub use storage::*;
