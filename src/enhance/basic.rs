//! Local adjustment chain: smoothing, brightness, contrast, saturation, sharpness

use super::{EnhanceOptions, Enhancer};
use crate::{
    error::Result,
    utils::{
        color::{luminance, mean_luminance},
        filters::{blend, blend_constant, convolve, SMOOTH, SMOOTH_MORE},
    },
};
use async_trait::async_trait;
use image::{Rgba, RgbaImage};

/// Factors within this distance of 1.0 skip their step entirely
const IDENTITY_EPSILON: f32 = 1e-6;

fn is_identity(factor: f32) -> bool {
    (factor - 1.0).abs() <= IDENTITY_EPSILON
}

/// The always-available enhancement strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEnhancer;

impl BasicEnhancer {
    /// Run the adjustment chain
    ///
    /// Steps run in a fixed order and only adjust color channels.
    #[must_use]
    pub fn apply(&self, image: &RgbaImage, options: &EnhanceOptions) -> RgbaImage {
        let mut out = image.clone();

        if options.skin_smooth {
            out = convolve(&out, &SMOOTH_MORE);
        }
        if !is_identity(options.brightness) {
            out = adjust_brightness(&out, options.brightness);
        }
        if !is_identity(options.contrast) {
            out = adjust_contrast(&out, options.contrast);
        }
        if !is_identity(options.saturation) {
            out = adjust_saturation(&out, options.saturation);
        }
        if !is_identity(options.sharpness) {
            out = adjust_sharpness(&out, options.sharpness);
        }

        out
    }
}

#[async_trait]
impl Enhancer for BasicEnhancer {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn enhance(&self, image: &RgbaImage, options: &EnhanceOptions) -> Result<RgbaImage> {
        Ok(self.apply(image, options))
    }
}

/// Scale towards black
#[must_use]
pub fn adjust_brightness(image: &RgbaImage, factor: f32) -> RgbaImage {
    blend_constant(image, 0, factor)
}

/// Scale around the mean luminance of the whole image
#[must_use]
pub fn adjust_contrast(image: &RgbaImage, factor: f32) -> RgbaImage {
    blend_constant(image, mean_luminance(image), factor)
}

/// Scale away from each pixel's own gray value
#[must_use]
pub fn adjust_saturation(image: &RgbaImage, factor: f32) -> RgbaImage {
    let mut gray = image.clone();
    for pixel in gray.pixels_mut() {
        let l = luminance(pixel[0], pixel[1], pixel[2]);
        *pixel = Rgba([l, l, l, pixel[3]]);
    }
    blend(&gray, image, factor)
}

/// Scale away from a 3x3 smoothed copy
#[must_use]
pub fn adjust_sharpness(image: &RgbaImage, factor: f32) -> RgbaImage {
    blend(&convolve(image, &SMOOTH), image, factor)
}
