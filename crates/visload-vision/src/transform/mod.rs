mod blur;
mod color;
mod crop;
mod flip;
mod perspective;
mod rotation;
mod warp;

pub use blur::*;
pub use color::*;
pub use crop::*;
pub use flip::*;
pub use perspective::*;
pub use rotation::*;

use image::imageops::FilterType;
use image::DynamicImage;
use rand::RngCore;

/// Transformation of an image, possibly random.
pub trait ImageTransform: Send + Sync {
    /// Applies the transform to `image`, drawing any randomness from `rng`.
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage;
}

impl<F> ImageTransform for F
where
    F: Fn(DynamicImage) -> DynamicImage + Send + Sync,
{
    fn apply(&self, image: DynamicImage, _rng: &mut dyn RngCore) -> DynamicImage {
        self(image)
    }
}

/// Applies transforms one after the other.
#[derive(Default)]
pub struct Compose {
    transforms: Vec<Box<dyn ImageTransform>>,
}

impl Compose {
    /// Creates a composition of `transforms`, applied in order.
    pub fn new(transforms: Vec<Box<dyn ImageTransform>>) -> Self {
        Self { transforms }
    }

    /// Appends a transform at the end of the composition.
    pub fn then<T: ImageTransform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Number of transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` if the composition is the identity.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl ImageTransform for Compose {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        self.transforms
            .iter()
            .fold(image, |image, transform| transform.apply(image, rng))
    }
}

/// Pixel interpolation used by geometric transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest neighbor.
    Nearest,
    /// Bilinear.
    #[default]
    Bilinear,
}

impl Interpolation {
    /// Matching resampling filter of the `image` crate.
    pub fn filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
        }
    }
}
