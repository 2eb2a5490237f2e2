//! Alpha edge refinement
//!
//! Sharpens the alpha channel of a cutout so the subject edge reads crisper after
//! compositing. Color channels are never touched.

use crate::{
    error::{IdPhotoError, Result},
    utils::filters::{blend, convolve, SMOOTH},
};
use image::{GrayImage, RgbaImage};

/// Default sharpening factor applied to the alpha plane
pub const DEFAULT_ALPHA_SHARPNESS: f32 = 1.2;

/// Alpha-channel sharpener
#[derive(Debug, Clone, Copy)]
pub struct AlphaRefiner {
    factor: f32,
}

impl Default for AlphaRefiner {
    fn default() -> Self {
        Self {
            factor: DEFAULT_ALPHA_SHARPNESS,
        }
    }
}

impl AlphaRefiner {
    /// Refiner with a custom sharpening factor (1.0 = unchanged)
    #[must_use]
    pub fn with_factor(factor: f32) -> Self {
        Self { factor }
    }

    /// Sharpen the alpha channel; on failure the input is returned unchanged
    #[must_use]
    pub fn refine(&self, image: RgbaImage) -> RgbaImage {
        match self.try_refine(&image) {
            Ok(refined) => refined,
            Err(e) => {
                log::warn!("Alpha refinement skipped: {}", e);
                image
            },
        }
    }

    /// Sharpen the alpha channel
    ///
    /// # Errors
    /// - The alpha plane cannot be rebuilt at the image dimensions
    pub fn try_refine(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let alpha: Vec<u8> = image.pixels().map(|p| p[3]).collect();
        let alpha = GrayImage::from_raw(width, height, alpha)
            .ok_or_else(|| IdPhotoError::segmentation("Alpha plane does not match image size"))?;

        let smoothed = convolve(&alpha, &SMOOTH);
        let sharpened = blend(&smoothed, &alpha, self.factor);

        let mut refined = image.clone();
        for (pixel, a) in refined.pixels_mut().zip(sharpened.pixels()) {
            pixel[3] = a[0];
        }
        Ok(refined)
    }
}
