use image::DynamicImage;
use rand::{Rng, RngCore};

use super::warp::warp;
use super::{ImageTransform, Interpolation};

/// Rotates the image by an angle drawn uniformly in `[-degrees, degrees]`.
///
/// Positive angles turn the image counter-clockwise around its center. The output keeps the
/// input size; uncovered areas are painted with `fill`.
#[derive(new, Debug, Clone, Copy)]
pub struct RandomRotation {
    degrees: f32,
    interpolation: Interpolation,
    fill: u8,
}

impl RandomRotation {
    /// Rotates `image` by `angle` degrees.
    pub fn rotate(&self, image: &DynamicImage, angle: f32) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
        let (sin, cos) = angle.to_radians().sin_cos();

        // Inverse rotation: output point back into the input image (y axis points down).
        warp(image, width, height, self.interpolation, self.fill, |x, y| {
            let (dx, dy) = (x - cx, y - cy);
            (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
        })
    }
}

impl ImageTransform for RandomRotation {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        let degrees = self.degrees.abs();
        let angle = if degrees > 0.0 {
            rng.random_range(-degrees..=degrees)
        } else {
            0.0
        };

        self.rotate(&image, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn quarter_turn_moves_corners_counter_clockwise() {
        let mut input = GrayImage::new(4, 4);
        input.put_pixel(3, 0, Luma([255]));
        let rotation = RandomRotation::new(90.0, Interpolation::Nearest, 0);

        let output = rotation
            .rotate(&DynamicImage::ImageLuma8(input), 90.0)
            .to_luma8();

        // The top right corner ends up top left.
        assert_eq!(output.get_pixel(0, 0).0, [255]);
        assert_eq!(output.pixels().filter(|pixel| pixel.0 == [255]).count(), 1);
    }

    #[test]
    fn rotation_fills_uncovered_corners() {
        let input = DynamicImage::ImageLuma8(GrayImage::from_pixel(9, 9, Luma([200])));
        let rotation = RandomRotation::new(15.0, Interpolation::Nearest, 0);

        let output = rotation.rotate(&input, 45.0).to_luma8();

        assert_eq!(output.get_pixel(0, 0).0, [0]);
        assert_eq!(output.get_pixel(4, 4).0, [200]);
        assert_eq!(output.dimensions(), (9, 9));
    }
}
