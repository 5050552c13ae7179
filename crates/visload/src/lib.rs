#![warn(missing_docs)]

//! # Visload
//!
//! Batched train and test loaders for image classification experiments.
//!
//! A dataset is selected by name with [loader], or through [DatasetLoaders] for an explicit
//! [LoaderConfig] and [storage](data::dataset::DatasetStorage). Each dataset comes with its
//! augmentation recipe; the caller provides the final [Preprocess](vision::Preprocess) stage.
//!
//! ```no_run
//! use std::sync::Arc;
//! use visload::vision::ImageClassification;
//!
//! let (train, test) = visload::loader("cifar10", Arc::new(ImageClassification::default()), 64, "cpu")?;
//!
//! for batch in train.iter() {
//!     assert_eq!(batch.images.shape()[1..], [3, 224, 224]);
//! }
//! # Ok::<(), visload::LoaderError>(())
//! ```

#[macro_use]
extern crate derive_new;

/// Dataset and data loader utilities.
pub mod data;

/// Image transforms and preprocessing.
pub use visload_vision as vision;

mod classification;
mod config;
mod device;
mod error;
mod loaders;

pub use classification::*;
pub use config::*;
pub use device::*;
pub use error::*;
pub use loaders::*;
