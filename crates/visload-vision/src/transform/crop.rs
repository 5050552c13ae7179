use image::DynamicImage;
use rand::{Rng, RngCore};

use super::{ImageTransform, Interpolation};

/// Crops a random region of the image and resizes it to `size`.
///
/// The region covers a fraction of the input area drawn in `scale`, with an aspect ratio
/// drawn log-uniformly in `ratio`. After ten rejected draws the largest central crop whose
/// ratio fits in `ratio` is used.
#[derive(Debug, Clone, Copy)]
pub struct RandomResizedCrop {
    size: (u32, u32),
    scale: (f32, f32),
    ratio: (f32, f32),
    interpolation: Interpolation,
}

/// Crop rectangle, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl RandomResizedCrop {
    /// Creates a square crop of side `size` with the usual scale `[0.08, 1]` and ratio
    /// `[3/4, 4/3]` ranges.
    pub fn new(size: u32) -> Self {
        Self {
            size: (size, size),
            scale: (0.08, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
            interpolation: Interpolation::Bilinear,
        }
    }

    /// Sets the range of the cropped area, relative to the input area.
    pub fn with_scale(mut self, min: f32, max: f32) -> Self {
        self.scale = (min, max);
        self
    }

    /// Sets the range of the crop aspect ratio (width over height).
    pub fn with_ratio(mut self, min: f32, max: f32) -> Self {
        self.ratio = (min, max);
        self
    }

    /// Sets the interpolation of the resize.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Draws a crop region for an image of the given dimensions.
    pub fn region(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> CropRegion {
        let area = (width * height) as f32;
        let (log_min, log_max) = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..10 {
            let target_area = area * uniform(rng, self.scale.0, self.scale.1);
            let aspect_ratio = uniform(rng, log_min, log_max).exp();

            let crop_width = (target_area * aspect_ratio).sqrt().round() as u32;
            let crop_height = (target_area / aspect_ratio).sqrt().round() as u32;

            if 0 < crop_width && crop_width <= width && 0 < crop_height && crop_height <= height {
                return CropRegion {
                    x: rng.random_range(0..=width - crop_width),
                    y: rng.random_range(0..=height - crop_height),
                    width: crop_width,
                    height: crop_height,
                };
            }
        }

        // Central crop fallback.
        let in_ratio = width as f32 / height as f32;
        let (crop_width, crop_height) = if in_ratio < self.ratio.0 {
            (width, ((width as f32 / self.ratio.0).round() as u32).max(1))
        } else if in_ratio > self.ratio.1 {
            (((height as f32 * self.ratio.1).round() as u32).max(1), height)
        } else {
            (width, height)
        };

        CropRegion {
            x: (width - crop_width) / 2,
            y: (height - crop_height) / 2,
            width: crop_width,
            height: crop_height,
        }
    }
}

/// Uniform draw in `[min, max)`, or `min` for an empty range.
fn uniform(rng: &mut dyn RngCore, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}

impl ImageTransform for RandomResizedCrop {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        if image.width() == 0 || image.height() == 0 {
            return image;
        }

        let region = self.region(image.width(), image.height(), rng);
        image
            .crop_imm(region.x, region.y, region.width, region.height)
            .resize_exact(self.size.0, self.size.1, self.interpolation.filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn output_has_requested_size() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])));
        let crop = RandomResizedCrop::new(224).with_scale(0.8, 1.0);
        let mut rng = StdRng::seed_from_u64(3);

        let output = crop.apply(image, &mut rng);

        assert_eq!((output.width(), output.height()), (224, 224));
        assert_eq!(output.to_rgb8().get_pixel(100, 100).0, [1, 2, 3]);
    }

    #[test]
    fn regions_respect_scale_and_bounds() {
        let crop = RandomResizedCrop::new(8).with_scale(0.8, 1.0);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..200 {
            let region = crop.region(32, 32, &mut rng);
            let covered = (region.width * region.height) as f32 / 1024.0;

            assert!(region.x + region.width <= 32);
            assert!(region.y + region.height <= 32);
            assert!(covered > 0.7 && covered <= 1.0, "covered {covered}");
        }
    }

    #[test]
    fn impossible_ratio_falls_back_to_central_crop() {
        let crop = RandomResizedCrop::new(8)
            .with_scale(1.0, 1.0)
            .with_ratio(4.0, 4.0);
        let mut rng = StdRng::seed_from_u64(0);

        let region = crop.region(40, 20, &mut rng);

        assert_eq!(
            region,
            CropRegion {
                x: 0,
                y: 5,
                width: 40,
                height: 10
            }
        );
    }
}
