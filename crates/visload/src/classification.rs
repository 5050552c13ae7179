use std::sync::{Arc, Mutex, PoisonError};

use ndarray::{Array1, Array4, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::dataloader::batcher::Batcher;
use crate::data::dataset::transform::{Mapper, RngSource};
use crate::data::dataset::vision::ImageItem;
use crate::vision::transform::{Compose, ImageTransform};
use crate::vision::{ImageTensor, Preprocess};

/// Preprocessed image with its class index.
#[derive(new, Debug, Clone, PartialEq)]
pub struct TensorItem {
    /// Image tensor, `[channels, height, width]`.
    pub image: ImageTensor,
    /// Class index.
    pub label: usize,
}

/// Full image pipeline of a split: augmentation, then preprocessing.
///
/// Each item is augmented with its own generator, seeded from a generator shared by every
/// worker. The shared generator is only locked to draw that seed, so workers augment in
/// parallel. The preprocessing is always the last stage.
pub struct Pipeline {
    augmentation: Compose,
    preprocess: Arc<dyn Preprocess>,
    rng: Mutex<StdRng>,
}

impl Pipeline {
    /// Creates a pipeline.
    ///
    /// # Arguments
    ///
    /// * `augmentation` - Transforms applied before `preprocess`, in order.
    /// * `preprocess` - Conversion of the augmented image into a tensor.
    /// * `rng` - Source of the augmentation randomness.
    pub fn new<R: Into<RngSource>>(
        augmentation: Compose,
        preprocess: Arc<dyn Preprocess>,
        rng: R,
    ) -> Self {
        Self {
            augmentation,
            preprocess,
            rng: Mutex::new(rng.into().into()),
        }
    }

    /// Pipeline made of the preprocessing only.
    pub fn preprocess_only(preprocess: Arc<dyn Preprocess>) -> Self {
        Self::new(Compose::default(), preprocess, RngSource::Seed(0))
    }

    /// Number of augmentation stages.
    pub fn num_augmentations(&self) -> usize {
        self.augmentation.len()
    }
}

impl Mapper<ImageItem, TensorItem> for Pipeline {
    fn map(&self, item: &ImageItem) -> TensorItem {
        let image = if self.augmentation.is_empty() {
            item.image.clone()
        } else {
            let seed: u64 = self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random();
            let mut rng = StdRng::seed_from_u64(seed);
            self.augmentation.apply(item.image.clone(), &mut rng)
        };

        TensorItem::new(self.preprocess.preprocess(&image), item.label)
    }
}

/// Batch of preprocessed images.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationBatch {
    /// Images, `[batch, channels, height, width]`.
    pub images: Array4<f32>,
    /// Class indices, `[batch]`.
    pub targets: Array1<i64>,
}

impl ClassificationBatch {
    /// Number of items of the batch.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if the batch holds no item.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Stacks [tensor items](TensorItem) into a [ClassificationBatch].
#[derive(new, Debug, Clone, Copy, Default)]
pub struct ClassificationBatcher;

impl Batcher<TensorItem, ClassificationBatch> for ClassificationBatcher {
    /// # Panics
    ///
    /// If the images of the batch do not share one shape.
    fn batch(&self, items: Vec<TensorItem>) -> ClassificationBatch {
        let targets = items.iter().map(|item| item.label as i64).collect();

        let images = if items.is_empty() {
            Array4::zeros((0, 0, 0, 0))
        } else {
            let views: Vec<ArrayView3<f32>> = items.iter().map(|item| item.image.view()).collect();
            match ndarray::stack(Axis(0), &views) {
                Ok(images) => images,
                Err(err) => panic!("Images of a batch must share one shape: {err}"),
            }
        };

        ClassificationBatch { images, targets }
    }
}
