//! Tensor conversion for the learned segmentation models
//!
//! The portrait and general models take a fixed square RGB input normalised with the
//! ImageNet statistics and produce a single-channel saliency map of the same size.

use crate::{
    error::{IdPhotoError, Result},
    types::SegmentationMask,
};
use image::{imageops::FilterType, GrayImage, Luma, RgbImage};
use ndarray::{Array4, ArrayViewD};

/// Model input geometry and normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square input side length
    pub target_size: u32,
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: 320,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Conversions between images and model tensors
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Resize to the model input and convert to a normalised NCHW tensor
    ///
    /// Pixel values are divided by the brightest channel value of the resized image before
    /// the mean/std normalisation.
    #[must_use]
    pub fn image_to_tensor(image: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let size = config.target_size;
        let resized = image::imageops::resize(image, size, size, FilterType::Lanczos3);
        let max_value = resized.as_raw().iter().copied().max().unwrap_or(0).max(1);
        let scale = f32::from(max_value);

        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = (f32::from(pixel[c]) / scale - config.normalization_mean[c])
                    / config.normalization_std[c];
                if let Some(slot) = tensor.get_mut([0, c, y as usize, x as usize]) {
                    *slot = value;
                }
            }
        }

        tensor
    }

    /// Turn the first model output into a mask at the source resolution
    ///
    /// Accepts `[1, 1, H, W]`, `[1, H, W]` or `[H, W]` outputs. Values are min-max
    /// normalised before scaling to 0-255.
    ///
    /// # Errors
    /// - Output has an unsupported rank or a zero-sized plane
    pub fn tensor_to_mask(
        output: &ArrayViewD<'_, f32>,
        original_dimensions: (u32, u32),
    ) -> Result<SegmentationMask> {
        let shape = output.shape();
        let (height, width) = match *shape {
            [1, 1, h, w] | [1, h, w] | [h, w] => (h, w),
            _ => {
                return Err(IdPhotoError::model(format!(
                    "Unexpected model output shape {:?}",
                    shape
                )))
            },
        };
        if height == 0 || width == 0 {
            return Err(IdPhotoError::model("Model output plane is empty"));
        }

        let values: Vec<f32> = output.iter().copied().collect();
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = if (max - min).abs() > f32::EPSILON {
            max - min
        } else {
            1.0
        };

        let mut plane = GrayImage::new(width as u32, height as u32);
        for (out, &value) in plane.pixels_mut().zip(&values) {
            let normalized = ((value - min) / range).clamp(0.0, 1.0);
            *out = Luma([(normalized * 255.0).round() as u8]);
        }

        let (orig_width, orig_height) = original_dimensions;
        let resized = image::imageops::resize(&plane, orig_width, orig_height, FilterType::Lanczos3);
        Ok(SegmentationMask::from_image(resized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use ndarray::ArrayD;

    #[test]
    fn test_image_to_tensor_shape_and_normalisation() {
        let image = RgbImage::from_pixel(100, 60, Rgb([255, 0, 0]));
        let config = PreprocessingConfig::default();
        let tensor = ImagePreprocessor::image_to_tensor(&image, &config);

        assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
        let red = tensor[[0, 0, 160, 160]];
        let expected = (1.0 - 0.485) / 0.229;
        assert!((red - expected).abs() < 1e-3);
    }

    #[test]
    fn test_tensor_to_mask_normalises_and_resizes() {
        let mut data = ArrayD::<f32>::zeros(vec![1, 1, 4, 4]);
        for y in 0..4 {
            for x in 2..4 {
                data[[0, 0, y, x]] = 0.5;
            }
        }
        let mask = ImagePreprocessor::tensor_to_mask(&data.view(), (8, 8)).unwrap();

        assert_eq!(mask.dimensions, (8, 8));
        assert!(mask.data[0] < 10);
        assert!(mask.data[7] > 245);
    }

    #[test]
    fn test_tensor_to_mask_rejects_bad_rank() {
        let data = ArrayD::<f32>::zeros(vec![2, 3, 4, 4]);
        assert!(ImagePreprocessor::tensor_to_mask(&data.view(), (4, 4)).is_err());
    }
}
