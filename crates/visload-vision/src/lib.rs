#![warn(missing_docs)]

//! # Visload Vision
//!
//! Random image augmentations and the conversion of images into normalized tensors.
//!
//! [Transforms](transform::ImageTransform) operate on [DynamicImage](image::DynamicImage)s
//! and draw their randomness from a caller provided generator, so a pipeline is
//! reproducible from a seed. A [Preprocess] is the final stage of every pipeline and
//! produces an [ImageTensor] laid out as `[channels, height, width]`.

#[macro_use]
extern crate derive_new;

/// Image augmentation transforms.
pub mod transform;

mod preprocess;

pub use preprocess::*;
