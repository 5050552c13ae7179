use image::{DynamicImage, GrayImage, Luma, Rgb, Rgb32FImage, RgbImage};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::ImageTransform;

/// ITU-R 601-2 luma of an RGB pixel.
fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn to_gray(image: &DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => {
            let rgb = other.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let [r, g, b] = rgb.get_pixel(x, y).0;
                Luma([luma(r as f32, g as f32, b as f32).round().clamp(0.0, 255.0) as u8])
            })
        }
    }
}

/// Converts the image to grayscale with `num_output_channels` channels.
///
/// With three output channels the gray value is replicated in every channel.
#[derive(new, Debug, Clone, Copy)]
pub struct Grayscale {
    num_output_channels: u8,
}

impl Grayscale {
    /// Converts `image`.
    pub fn convert(&self, image: &DynamicImage) -> DynamicImage {
        let gray = to_gray(image);

        if self.num_output_channels == 3 {
            let rgb = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
                let [value] = gray.get_pixel(x, y).0;
                Rgb([value; 3])
            });
            DynamicImage::ImageRgb8(rgb)
        } else {
            DynamicImage::ImageLuma8(gray)
        }
    }
}

impl ImageTransform for Grayscale {
    fn apply(&self, image: DynamicImage, _rng: &mut dyn RngCore) -> DynamicImage {
        self.convert(&image)
    }
}

/// Converts the image to grayscale with probability `p`, keeping its number of channels.
#[derive(new, Debug, Clone, Copy)]
pub struct RandomGrayscale {
    p: f64,
}

impl ImageTransform for RandomGrayscale {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        if !rng.random_bool(self.p.clamp(0.0, 1.0)) {
            return image;
        }

        let channels = if image.color().channel_count() == 1 { 1 } else { 3 };
        Grayscale::new(channels).convert(&image)
    }
}

/// Randomly changes the brightness, contrast, saturation and hue of an image.
///
/// Brightness, contrast and saturation factors are drawn in `[max(0, 1 - v), 1 + v]` and the
/// hue shift in `[-hue, hue]` (fraction of a full turn, at most 0.5). The four adjustments
/// are applied in a random order.
#[derive(Debug, Clone, Copy)]
pub struct ColorJitter {
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
}

#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
}

impl ColorJitter {
    /// Creates a color jitter. `hue` is clamped to `[0, 0.5]`.
    pub fn new(brightness: f32, contrast: f32, saturation: f32, hue: f32) -> Self {
        Self {
            brightness: brightness.max(0.0),
            contrast: contrast.max(0.0),
            saturation: saturation.max(0.0),
            hue: hue.clamp(0.0, 0.5),
        }
    }

    fn factor(rng: &mut dyn RngCore, amount: f32) -> Option<f32> {
        (amount > 0.0).then(|| rng.random_range((1.0 - amount).max(0.0)..=1.0 + amount))
    }

    fn adjustments(&self, rng: &mut dyn RngCore) -> Vec<Adjustment> {
        let mut order = [0usize, 1, 2, 3];
        order.shuffle(rng);

        order
            .into_iter()
            .filter_map(|index| match index {
                0 => Self::factor(rng, self.brightness).map(Adjustment::Brightness),
                1 => Self::factor(rng, self.contrast).map(Adjustment::Contrast),
                2 => Self::factor(rng, self.saturation).map(Adjustment::Saturation),
                _ => (self.hue > 0.0)
                    .then(|| rng.random_range(-self.hue..=self.hue))
                    .map(Adjustment::Hue),
            })
            .collect()
    }
}

impl ImageTransform for ColorJitter {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        let adjustments = self.adjustments(rng);
        if adjustments.is_empty() {
            return image;
        }

        let grayscale = image.color().channel_count() == 1;
        let mut rgb = image.to_rgb32f();

        for adjustment in adjustments {
            match adjustment {
                Adjustment::Brightness(factor) => adjust_brightness(&mut rgb, factor),
                Adjustment::Contrast(factor) => adjust_contrast(&mut rgb, factor),
                Adjustment::Saturation(factor) => adjust_saturation(&mut rgb, factor),
                Adjustment::Hue(shift) => adjust_hue(&mut rgb, shift),
            }
        }

        let output = DynamicImage::ImageRgb32F(rgb);
        if grayscale {
            DynamicImage::ImageLuma8(output.to_luma8())
        } else {
            DynamicImage::ImageRgb8(output.to_rgb8())
        }
    }
}

/// Blends `value` with `other`: `factor * value + (1 - factor) * other`, clamped to `[0, 1]`.
fn blend(value: f32, other: f32, factor: f32) -> f32 {
    (factor * value + (1.0 - factor) * other).clamp(0.0, 1.0)
}

fn adjust_brightness(image: &mut Rgb32FImage, factor: f32) {
    for value in image.iter_mut() {
        *value = blend(*value, 0.0, factor);
    }
}

fn adjust_contrast(image: &mut Rgb32FImage, factor: f32) {
    let pixels = (image.width() * image.height()).max(1) as f32;
    let mean = image
        .pixels()
        .map(|Rgb([r, g, b])| luma(*r, *g, *b))
        .sum::<f32>()
        / pixels;

    for value in image.iter_mut() {
        *value = blend(*value, mean, factor);
    }
}

fn adjust_saturation(image: &mut Rgb32FImage, factor: f32) {
    for pixel in image.pixels_mut() {
        let [r, g, b] = pixel.0;
        let gray = luma(r, g, b);
        pixel.0 = [r, g, b].map(|value| blend(value, gray, factor));
    }
}

fn adjust_hue(image: &mut Rgb32FImage, shift: f32) {
    for pixel in image.pixels_mut() {
        let (h, s, v) = rgb_to_hsv(pixel.0);
        pixel.0 = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
    }
}

/// RGB in `[0, 1]` to hue (fraction of a turn), saturation and value.
fn rgb_to_hsv([r, g, b]: [f32; 3]) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= f32::EPSILON {
        return (0.0, saturation, max);
    }

    let hue = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };

    ((hue / 6.0).rem_euclid(1.0), saturation, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as i32 % 6 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn colorful() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, y| {
            Rgb([x as u8 * 30, y as u8 * 30, 128])
        }))
    }

    #[test]
    fn grayscale_replicates_channels() {
        let output = Grayscale::new(3).convert(&colorful()).to_rgb8();

        assert!(output.pixels().all(|Rgb([r, g, b])| r == g && g == b));
        // 0.299 * 60 + 0.587 * 90 + 0.114 * 128 = 85.3
        assert_eq!(output.get_pixel(2, 3).0, [85, 85, 85]);
    }

    #[test]
    fn grayscale_single_channel_output() {
        let output = Grayscale::new(1).convert(&colorful());

        assert_eq!(output.color(), image::ColorType::L8);
    }

    #[test]
    fn random_grayscale_keeps_channel_count() {
        let mut rng = StdRng::seed_from_u64(5);

        let output = RandomGrayscale::new(1.0).apply(colorful(), &mut rng);

        assert_eq!(output.color(), image::ColorType::Rgb8);
        assert_eq!(output, Grayscale::new(3).convert(&colorful()));
    }

    #[test]
    fn jitter_without_amounts_is_identity() {
        let mut rng = StdRng::seed_from_u64(5);

        let output = ColorJitter::new(0.0, 0.0, 0.0, 0.0).apply(colorful(), &mut rng);

        assert_eq!(output, colorful());
    }

    #[test]
    fn jitter_changes_colors_but_not_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let jitter = ColorJitter::new(0.2, 0.2, 0.2, 0.1);

        let outputs: Vec<_> = (0..4).map(|_| jitter.apply(colorful(), &mut rng)).collect();

        assert!(outputs
            .iter()
            .all(|output| output.width() == 8 && output.height() == 8));
        assert!(outputs.iter().any(|output| *output != colorful()));
    }

    #[test]
    fn hsv_conversion_is_consistent() {
        for rgb in [[1.0, 0.0, 0.0], [0.2, 0.6, 0.4], [0.5, 0.5, 0.5], [0.1, 0.2, 0.9]] {
            let (h, s, v) = rgb_to_hsv(rgb);
            let back = hsv_to_rgb(h, s, v);

            for (expected, actual) in rgb.iter().zip(back) {
                assert!((expected - actual).abs() < 1e-5, "{rgb:?} -> {back:?}");
            }
        }
    }
}
