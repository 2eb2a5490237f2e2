//! Luminance helpers

use image::{GrayImage, Luma, Pixel};

/// ITU-R BT.601 luma of an RGB triple, in fixed point
#[inline]
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114;
    ((weighted + 500) / 1000) as u8
}

/// Single-channel luminance plane of any 8-bit color image
#[must_use]
pub fn luminance_plane<P>(image: &image::ImageBuffer<P, Vec<u8>>) -> GrayImage
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (out, px) in gray.pixels_mut().zip(image.pixels()) {
        let rgb = px.to_rgb();
        *out = Luma([luminance(rgb[0], rgb[1], rgb[2])]);
    }
    gray
}

/// Mean luminance rounded to the nearest integer, 0 for an empty image
#[must_use]
pub fn mean_luminance<P>(image: &image::ImageBuffer<P, Vec<u8>>) -> u8
where
    P: Pixel<Subpixel = u8>,
{
    let count = u64::from(image.width()) * u64::from(image.height());
    if count == 0 {
        return 0;
    }
    let sum: u64 = image
        .pixels()
        .map(|px| {
            let rgb = px.to_rgb();
            u64::from(luminance(rgb[0], rgb[1], rgb[2]))
        })
        .sum();
    ((sum + count / 2) / count) as u8
}
