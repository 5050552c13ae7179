use image::DynamicImage;
use rand::{Rng, RngCore};

use super::ImageTransform;

/// Mirrors the image left to right with probability `p`.
#[derive(new, Debug, Clone, Copy)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl ImageTransform for RandomHorizontalFlip {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        if rng.random_bool(self.p.clamp(0.0, 1.0)) {
            image.fliph()
        } else {
            image
        }
    }
}

/// Mirrors the image top to bottom with probability `p`.
#[derive(new, Debug, Clone, Copy)]
pub struct RandomVerticalFlip {
    p: f64,
}

impl ImageTransform for RandomVerticalFlip {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        if rng.random_bool(self.p.clamp(0.0, 1.0)) {
            image.flipv()
        } else {
            image
        }
    }
}
