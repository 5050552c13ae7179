use image::DynamicImage;
use rand::{Rng, RngCore};

use super::warp::warp;
use super::{ImageTransform, Interpolation};

/// Applies a random perspective distortion with probability `p`.
///
/// Each corner of the image is moved inwards by a random amount, at most `distortion_scale`
/// times half the image side. Uncovered areas are painted with `fill`.
#[derive(new, Debug, Clone, Copy)]
pub struct RandomPerspective {
    distortion_scale: f32,
    p: f64,
    interpolation: Interpolation,
    fill: u8,
}

/// Corner points, clockwise from the top left.
pub type Quad = [(f32, f32); 4];

impl RandomPerspective {
    /// Draws the destination corners of the distortion for an image of the given size.
    ///
    /// Returns the source corners followed by their destination.
    pub fn corners(&self, width: u32, height: u32, rng: &mut dyn RngCore) -> (Quad, Quad) {
        let (w, h) = (width as i64, height as i64);
        let dx = (self.distortion_scale * (width / 2) as f32) as i64;
        let dy = (self.distortion_scale * (height / 2) as f32) as i64;

        let mut draw = |low: i64, high: i64| -> f32 { rng.random_range(low..=high.max(low)) as f32 };

        let top_left = (draw(0, dx), draw(0, dy));
        let top_right = (draw(w - dx - 1, w - 1), draw(0, dy));
        let bottom_right = (draw(w - dx - 1, w - 1), draw(h - dy - 1, h - 1));
        let bottom_left = (draw(0, dx), draw(h - dy - 1, h - 1));

        let (right, bottom) = ((w - 1) as f32, (h - 1) as f32);
        let start = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

        (start, [top_left, top_right, bottom_right, bottom_left])
    }

    /// Warps `image` so that the `start` corners land on `end`.
    ///
    /// Returns `None` when the corners do not define a valid homography.
    pub fn distort(&self, image: &DynamicImage, start: &Quad, end: &Quad) -> Option<DynamicImage> {
        // Maps output points back to the input.
        let [a, b, c, d, e, f, g, h] = homography(end, start)?;

        Some(warp(
            image,
            image.width(),
            image.height(),
            self.interpolation,
            self.fill,
            |x, y| {
                let (x, y) = (x - 0.5, y - 0.5);
                let denominator = g * x + h * y + 1.0;
                (
                    (a * x + b * y + c) / denominator + 0.5,
                    (d * x + e * y + f) / denominator + 0.5,
                )
            },
        ))
    }
}

impl ImageTransform for RandomPerspective {
    fn apply(&self, image: DynamicImage, rng: &mut dyn RngCore) -> DynamicImage {
        if !rng.random_bool(self.p.clamp(0.0, 1.0)) || image.width() < 2 || image.height() < 2 {
            return image;
        }

        let (start, end) = self.corners(image.width(), image.height(), rng);
        match self.distort(&image, &start, &end) {
            Some(distorted) => distorted,
            None => image,
        }
    }
}

/// Coefficients `[a, b, c, d, e, f, g, h]` of the projective map sending each `from` point to
/// the matching `to` point:
///
/// `x' = (a x + b y + c) / (g x + h y + 1)`, `y' = (d x + e y + f) / (g x + h y + 1)`.
fn homography(from: &Quad, to: &Quad) -> Option<[f32; 8]> {
    let mut system = [[0f64; 9]; 8];

    for (i, (&(x, y), &(u, v))) in from.iter().zip(to.iter()).enumerate() {
        let (x, y, u, v) = (x as f64, y as f64, u as f64, v as f64);
        system[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
        system[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
    }

    let solution = solve(system)?;
    Some(solution.map(|value| value as f32))
}

/// Gaussian elimination with partial pivoting on an augmented 8x9 matrix.
fn solve(mut system: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for column in 0..8 {
        let pivot = (column..8).max_by(|&i, &j| {
            system[i][column]
                .abs()
                .total_cmp(&system[j][column].abs())
        })?;
        if system[pivot][column].abs() < 1e-12 {
            return None;
        }
        system.swap(column, pivot);

        for row in 0..8 {
            if row == column {
                continue;
            }
            let factor = system[row][column] / system[column][column];
            for k in column..9 {
                system[row][k] -= factor * system[column][k];
            }
        }
    }

    let mut solution = [0f64; 8];
    for (i, value) in solution.iter_mut().enumerate() {
        *value = system[i][8] / system[i][i];
    }
    Some(solution)
}
