use image::{DynamicImage, ImageBuffer, Pixel};

use super::Interpolation;

/// Resamples `image` into a `width` x `height` image.
///
/// `source` maps the center of an output pixel to a point of the input image, both in
/// continuous coordinates where pixel `(x, y)` covers `[x, x + 1) x [y, y + 1)`. Points
/// falling outside of the input are painted with `fill`.
///
/// Grayscale images stay grayscale; every other color type is resampled as 8-bit RGB.
pub(crate) fn warp<F>(
    image: &DynamicImage,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    fill: u8,
    source: F,
) -> DynamicImage
where
    F: Fn(f32, f32) -> (f32, f32),
{
    match image {
        DynamicImage::ImageLuma8(buffer) => DynamicImage::ImageLuma8(warp_buffer(
            buffer,
            width,
            height,
            interpolation,
            fill,
            &source,
        )),
        other => DynamicImage::ImageRgb8(warp_buffer(
            &other.to_rgb8(),
            width,
            height,
            interpolation,
            fill,
            &source,
        )),
    }
}

fn warp_buffer<P, F>(
    input: &ImageBuffer<P, Vec<u8>>,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    fill: u8,
    source: &F,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
    F: Fn(f32, f32) -> (f32, f32),
{
    let channels = P::CHANNEL_COUNT as usize;
    let fill_pixel = *P::from_slice(&[fill; 4][..channels]);
    let (in_width, in_height) = (input.width() as i64, input.height() as i64);

    let texel = |x: i64, y: i64| -> &[u8] {
        if x < 0 || y < 0 || x >= in_width || y >= in_height {
            fill_pixel.channels()
        } else {
            input.get_pixel(x as u32, y as u32).channels()
        }
    };

    ImageBuffer::from_fn(width, height, |x, y| {
        let (sx, sy) = source(x as f32 + 0.5, y as f32 + 0.5);
        if !sx.is_finite() || !sy.is_finite() {
            return fill_pixel;
        }

        match interpolation {
            Interpolation::Nearest => *P::from_slice(texel(sx.floor() as i64, sy.floor() as i64)),
            Interpolation::Bilinear => {
                // Continuous coordinates relative to texel centers.
                let u = sx - 0.5;
                let v = sy - 0.5;
                let (x0, y0) = (u.floor(), v.floor());
                let (fx, fy) = (u - x0, v - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);

                let corners = [
                    (texel(x0, y0), (1.0 - fx) * (1.0 - fy)),
                    (texel(x0 + 1, y0), fx * (1.0 - fy)),
                    (texel(x0, y0 + 1), (1.0 - fx) * fy),
                    (texel(x0 + 1, y0 + 1), fx * fy),
                ];

                let mut values = [0u8; 4];
                for (c, value) in values.iter_mut().enumerate().take(channels) {
                    let sum: f32 = corners
                        .iter()
                        .map(|(texel, weight)| texel[c] as f32 * weight)
                        .sum();
                    *value = sum.round().clamp(0.0, 255.0) as u8;
                }
                *P::from_slice(&values[..channels])
            }
        }
    })
}
