use image::{DynamicImage, ImageBuffer, Pixel};
use rand::{Rng, RngCore};

use super::ImageTransform;

/// Blurs the image with a Gaussian kernel whose standard deviation is drawn in `sigma`.
///
/// `kernel_size` is `(width, height)`; both must be odd. Borders are reflected.
#[derive(Debug, Clone, Copy)]
pub struct GaussianBlur {
    kernel_size: (usize, usize),
    sigma: (f32, f32),
}

impl GaussianBlur {
    /// Creates a Gaussian blur. Even kernel sizes are rounded up to the next odd size.
    pub fn new(kernel_size: (usize, usize), sigma: (f32, f32)) -> Self {
        let odd = |size: usize| size.max(1) | 1;
        let min = sigma.0.max(f32::EPSILON);

        Self {
            kernel_size: (odd(kernel_size.0), odd(kernel_size.1)),
            sigma: (min, sigma.1.max(min)),
        }
    }

    /// Blurs `image` with the given standard deviation.
    pub fn blur(&self, image: &DynamicImage, sigma: f32) -> DynamicImage {
        let kernel_x = kernel(self.kernel_size.0, sigma);
        let kernel_y = kernel(self.kernel_size.1, sigma);

        match image {
            DynamicImage::ImageLuma8(buffer) => {
                DynamicImage::ImageLuma8(blur_buffer(buffer, &kernel_x, &kernel_y))
            }
            other => DynamicImage::ImageRgb8(blur_buffer(&other.to_rgb8(), &kernel_x, &kernel_y)),
        }
    }
}

impl ImageTransform for GaussianBlur {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        let sigma = if self.sigma.1 > self.sigma.0 {
            rng.random_range(self.sigma.0..=self.sigma.1)
        } else {
            self.sigma.0
        };

        self.blur(&image, sigma)
    }
}

/// Normalized 1D Gaussian kernel of odd `size`.
fn kernel(size: usize, sigma: f32) -> Vec<f32> {
    let half = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let x = (i as f32 - half) / sigma;
            (-0.5 * x * x).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();

    weights.into_iter().map(|weight| weight / sum).collect()
}

/// Reflects `index` into `[0, len)` without repeating the border.
fn reflect(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let index = index.rem_euclid(period);
    (if index < len { index } else { period - index }) as usize
}

fn blur_buffer<P>(
    input: &ImageBuffer<P, Vec<u8>>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = (input.width() as usize, input.height() as usize);
    let channels = P::CHANNEL_COUNT as usize;
    let raw = input.as_raw();
    let (half_x, half_y) = ((kernel_x.len() / 2) as i64, (kernel_y.len() / 2) as i64);

    // Horizontal pass.
    let mut horizontal = vec![0f32; raw.len()];
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                horizontal[(y * width + x) * channels + c] = kernel_x
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        let sx = reflect(x as i64 + k as i64 - half_x, width as i64);
                        raw[(y * width + sx) * channels + c] as f32 * weight
                    })
                    .sum();
            }
        }
    }

    // Vertical pass.
    let mut output = vec![0u8; raw.len()];
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let value: f32 = kernel_y
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        let sy = reflect(y as i64 + k as i64 - half_y, height as i64);
                        horizontal[(sy * width + x) * channels + c] * weight
                    })
                    .sum();
                output[(y * width + x) * channels + c] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Same dimensions and channel count as the input.
    ImageBuffer::from_raw(input.width(), input.height(), output)
        .unwrap_or_else(|| input.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let weights = kernel(9, 2.0);

        assert_eq!(weights.len(), 9);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((weights[0] - weights[8]).abs() < 1e-7);
        assert!(weights[4] > weights[3]);
    }

    #[test]
    fn reflect_indices() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5), 3);
        assert_eq!(reflect(2, 5), 2);
        assert_eq!(reflect(-3, 1), 0);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 4, Rgb([10, 120, 240])));
        let blur = GaussianBlur::new((5, 9), (0.1, 5.0));
        let mut rng = StdRng::seed_from_u64(2);

        assert_eq!(blur.apply(image.clone(), &mut rng), image);
    }

    #[test]
    fn blur_spreads_a_single_point() {
        let mut input = GrayImage::new(9, 9);
        input.put_pixel(4, 4, Luma([255]));
        let blur = GaussianBlur::new((5, 9), (0.1, 5.0));

        let output = blur.blur(&DynamicImage::ImageLuma8(input), 1.0).to_luma8();

        assert!(output.get_pixel(4, 4).0[0] < 255);
        assert!(output.get_pixel(5, 4).0[0] > 0);
        assert!(output.get_pixel(4, 6).0[0] > 0);
        assert!(output.get_pixel(4, 4).0[0] > output.get_pixel(5, 4).0[0]);
    }
}
