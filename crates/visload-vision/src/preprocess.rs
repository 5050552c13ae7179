use image::DynamicImage;
use ndarray::{Array3, Axis};

use crate::transform::Interpolation;

/// Image tensor laid out as `[channels, height, width]`.
pub type ImageTensor = Array3<f32>;

/// Mean of the ImageNet training set, per RGB channel.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Standard deviation of the ImageNet training set, per RGB channel.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Final stage of an image pipeline, turning an image into a tensor.
pub trait Preprocess: Send + Sync {
    /// Converts `image` into a tensor.
    fn preprocess(&self, image: &DynamicImage) -> ImageTensor;
}

impl<F> Preprocess for F
where
    F: Fn(&DynamicImage) -> ImageTensor + Send + Sync,
{
    fn preprocess(&self, image: &DynamicImage) -> ImageTensor {
        self(image)
    }
}

/// Converts an image into a tensor with values in `[0, 1]`.
///
/// Grayscale images give one channel, every other color type three.
pub fn to_tensor(image: &DynamicImage) -> ImageTensor {
    let (width, height) = (image.width() as usize, image.height() as usize);

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let raw = gray.as_raw();
            Array3::from_shape_fn((1, height, width), |(_, y, x)| {
                raw[y * width + x] as f32 / 255.0
            })
        }
        other => {
            let rgb = other.to_rgb8();
            let raw = rgb.as_raw();
            Array3::from_shape_fn((3, height, width), |(c, y, x)| {
                raw[(y * width + x) * 3 + c] as f32 / 255.0
            })
        }
    }
}

/// Scales pixel values to `[0, 1]` without resizing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToTensor;

impl Preprocess for ToTensor {
    fn preprocess(&self, image: &DynamicImage) -> ImageTensor {
        to_tensor(image)
    }
}

/// Inference transform of image classification models.
///
/// The shorter side is resized to `resize_size`, the center `crop_size` square is kept, then
/// values are scaled to `[0, 1]` and normalized with `mean` and `std`. A single channel
/// image is repeated over the channels of the statistics.
#[derive(Debug, Clone)]
pub struct ImageClassification {
    crop_size: u32,
    resize_size: u32,
    mean: Vec<f32>,
    std: Vec<f32>,
    interpolation: Interpolation,
}

impl Default for ImageClassification {
    fn default() -> Self {
        Self::new(224, 256)
    }
}

impl ImageClassification {
    /// Creates the transform with ImageNet statistics and bilinear interpolation.
    pub fn new(crop_size: u32, resize_size: u32) -> Self {
        Self {
            crop_size,
            resize_size,
            mean: IMAGENET_MEAN.to_vec(),
            std: IMAGENET_STD.to_vec(),
            interpolation: Interpolation::Bilinear,
        }
    }

    /// Sets the per channel normalization statistics.
    pub fn with_mean_std(mut self, mean: Vec<f32>, std: Vec<f32>) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    /// Sets the interpolation of the resize.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    fn resize_crop(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = (image.width().max(1), image.height().max(1));
        let short = width.min(height) as f32;
        let scale = self.resize_size as f32 / short;

        let (new_width, new_height) = if width <= height {
            (
                self.resize_size,
                ((height as f32 * scale) as u32).max(self.resize_size),
            )
        } else {
            (
                ((width as f32 * scale) as u32).max(self.resize_size),
                self.resize_size,
            )
        };
        let resized = image.resize_exact(new_width, new_height, self.interpolation.filter());

        let crop_width = self.crop_size.min(new_width);
        let crop_height = self.crop_size.min(new_height);
        let left = ((new_width - crop_width) as f32 / 2.0).round() as u32;
        let top = ((new_height - crop_height) as f32 / 2.0).round() as u32;

        resized.crop_imm(left, top, crop_width, crop_height)
    }
}

impl Preprocess for ImageClassification {
    fn preprocess(&self, image: &DynamicImage) -> ImageTensor {
        let mut tensor = to_tensor(&self.resize_crop(image));

        let stats = self.mean.len().min(self.std.len());
        if tensor.len_of(Axis(0)) == 1 && stats > 1 {
            let gray = tensor.clone();
            let views = vec![gray.view(); stats];
            if let Ok(repeated) = ndarray::concatenate(Axis(0), &views) {
                tensor = repeated;
            }
        }

        for (c, mut channel) in tensor.axis_iter_mut(Axis(0)).enumerate() {
            if c < stats {
                let (mean, std) = (self.mean[c], self.std[c]);
                channel.mapv_inplace(|value| (value - mean) / std);
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use rstest::rstest;

    #[test]
    fn to_tensor_is_channel_first() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(3, 2, |x, y| {
            Rgb([x as u8 * 100, y as u8 * 255, 51])
        }));

        let tensor = ToTensor.preprocess(&image);

        assert_eq!(tensor.shape(), &[3, 2, 3]);
        assert_eq!(tensor[[0, 0, 2]], 200.0 / 255.0);
        assert_eq!(tensor[[1, 1, 0]], 1.0);
        assert_eq!(tensor[[2, 1, 1]], 0.2);
    }

    #[test]
    fn to_tensor_keeps_single_channel() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));

        let tensor = ToTensor.preprocess(&image);

        assert_eq!(tensor.shape(), &[1, 4, 4]);
    }

    #[rstest]
    #[case::square(32, 32)]
    #[case::wide(64, 40)]
    #[case::tall(30, 50)]
    fn image_classification_outputs_crop(#[case] width: u32, #[case] height: u32) {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 0])));

        let tensor = ImageClassification::new(24, 28).preprocess(&image);

        assert_eq!(tensor.shape(), &[3, 24, 24]);
    }

    #[test]
    fn image_classification_normalizes_channels() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 255])));

        let tensor = ImageClassification::new(8, 8).preprocess(&image);

        assert!((tensor[[0, 3, 3]] - (1.0 - 0.485) / 0.229).abs() < 1e-5);
        assert!((tensor[[1, 3, 3]] - (0.0 - 0.456) / 0.224).abs() < 1e-5);
        assert!((tensor[[2, 3, 3]] - (1.0 - 0.406) / 0.225).abs() < 1e-5);
    }

    #[test]
    fn grayscale_is_repeated_over_statistics() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([0])));

        let tensor = ImageClassification::new(8, 8).preprocess(&image);

        assert_eq!(tensor.shape(), &[3, 8, 8]);
        assert!((tensor[[2, 0, 0]] + 0.406 / 0.225).abs() < 1e-5);
    }
}
