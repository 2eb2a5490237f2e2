//! Small fixed-kernel filters and blend operations on 8-bit images
//!
//! Filters and blends touch only the color channels of a pixel (the first three, or the
//! single channel of a grayscale image); an alpha channel is carried through unchanged.

use image::{ImageBuffer, Pixel};

/// Integer convolution kernel with a normalising divisor
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    /// Side length (odd)
    pub size: u32,
    /// Row-major weights, `size * size` entries
    pub weights: &'static [i32],
    /// Sum the weighted values are divided by
    pub divisor: i32,
}

/// 3x3 smoothing kernel used as the degenerate image for sharpening
pub const SMOOTH: Kernel = Kernel {
    size: 3,
    weights: &[1, 1, 1, 1, 5, 1, 1, 1, 1],
    divisor: 13,
};

/// 5x5 strong smoothing kernel used for skin softening
pub const SMOOTH_MORE: Kernel = Kernel {
    size: 5,
    weights: &[
        1, 1, 1, 1, 1, //
        1, 5, 5, 5, 1, //
        1, 5, 44, 5, 1, //
        1, 5, 5, 5, 1, //
        1, 1, 1, 1, 1,
    ],
    divisor: 100,
};

fn color_channels<P: Pixel>() -> usize {
    usize::from(P::CHANNEL_COUNT).min(3)
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convolve `image` with `kernel`
///
/// Pixels closer to the border than the kernel radius are copied from the source.
#[must_use]
pub fn convolve<P>(image: &ImageBuffer<P, Vec<u8>>, kernel: &Kernel) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let radius = kernel.size / 2;
    let mut out = image.clone();
    if width <= 2 * radius || height <= 2 * radius {
        return out;
    }

    let stride = usize::from(P::CHANNEL_COUNT);
    let channels = color_channels::<P>();
    let row_len = width as usize * stride;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut out;
    let size = kernel.size as usize;

    for y in radius..height - radius {
        for x in radius..width - radius {
            let base = y as usize * row_len + x as usize * stride;
            for c in 0..channels {
                let mut acc = 0i32;
                for ky in 0..size {
                    let row = (y - radius) as usize + ky;
                    for kx in 0..size {
                        let col = (x - radius) as usize + kx;
                        let weight = kernel.weights.get(ky * size + kx).copied().unwrap_or(0);
                        let value = src.get(row * row_len + col * stride + c).copied().unwrap_or(0);
                        acc += weight * i32::from(value);
                    }
                }
                let value = (acc + kernel.divisor / 2) / kernel.divisor;
                if let Some(slot) = dst.get_mut(base + c) {
                    *slot = value.clamp(0, 255) as u8;
                }
            }
        }
    }

    out
}

/// Interpolate between `degenerate` and `image`: `d + factor * (v - d)`
///
/// `factor` 0.0 yields `degenerate`, 1.0 yields `image`, above 1.0 extrapolates away from
/// `degenerate`. Both images must have the same dimensions.
#[must_use]
pub fn blend<P>(
    degenerate: &ImageBuffer<P, Vec<u8>>,
    image: &ImageBuffer<P, Vec<u8>>,
    factor: f32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = image.clone();
    let stride = usize::from(P::CHANNEL_COUNT);
    let channels = color_channels::<P>();
    let dst: &mut [u8] = &mut out;

    for ((out_px, src_px), deg_px) in dst
        .chunks_exact_mut(stride)
        .zip(image.as_raw().chunks_exact(stride))
        .zip(degenerate.as_raw().chunks_exact(stride))
    {
        for c in 0..channels {
            if let (Some(o), Some(&v), Some(&d)) = (out_px.get_mut(c), src_px.get(c), deg_px.get(c)) {
                let d = f32::from(d);
                *o = clamp_u8(d + factor * (f32::from(v) - d));
            }
        }
    }

    out
}

/// Interpolate every color channel towards a constant: `k + factor * (v - k)`
#[must_use]
pub fn blend_constant<P>(image: &ImageBuffer<P, Vec<u8>>, constant: u8, factor: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = image.clone();
    let stride = usize::from(P::CHANNEL_COUNT);
    let channels = color_channels::<P>();
    let k = f32::from(constant);
    let dst: &mut [u8] = &mut out;

    for px in dst.chunks_exact_mut(stride) {
        for value in px.iter_mut().take(channels) {
            *value = clamp_u8(k + factor * (f32::from(*value) - k));
        }
    }

    out
}
