//! Output format handling service
//!
//! Converts composited RGBA canvases into encoded JPEG or PNG bytes.

use crate::{
    config::OutputFormat,
    error::{IdPhotoError, Result},
};
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    },
    DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage,
};

/// JPEG quality used when the request quality is not a number
const FALLBACK_JPEG_QUALITY: u8 = 80;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Map a `[0, 1]` quality to a JPEG quality of `1..=100`
    ///
    /// # Examples
    /// ```rust
    /// use idphoto::services::OutputFormatHandler;
    ///
    /// assert_eq!(OutputFormatHandler::jpeg_quality(0.8), 80);
    /// assert_eq!(OutputFormatHandler::jpeg_quality(0.0), 1);
    /// assert_eq!(OutputFormatHandler::jpeg_quality(7.5), 100);
    /// ```
    #[must_use]
    pub fn jpeg_quality(quality: f32) -> u8 {
        if quality.is_nan() {
            return FALLBACK_JPEG_QUALITY;
        }
        (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Encode `image` as `format`; `quality` only affects JPEG
    ///
    /// # Errors
    /// - Encoder failure
    pub fn encode(image: &RgbaImage, format: OutputFormat, quality: f32) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        let mut buffer = Vec::new();

        match format {
            OutputFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut buffer, Self::jpeg_quality(quality))
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| IdPhotoError::encoding(format!("Failed to encode JPEG: {}", e)))?;
            },
            OutputFormat::Png => {
                PngEncoder::new_with_quality(
                    &mut buffer,
                    CompressionType::Best,
                    PngFilterType::Adaptive,
                )
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(|e| IdPhotoError::encoding(format!("Failed to encode PNG: {}", e)))?;
            },
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_jpeg_quality_mapping() {
        assert_eq!(OutputFormatHandler::jpeg_quality(1.0), 100);
        assert_eq!(OutputFormatHandler::jpeg_quality(0.913), 91);
        assert_eq!(OutputFormatHandler::jpeg_quality(-2.0), 1);
        assert_eq!(OutputFormatHandler::jpeg_quality(f32::NAN), 80);
    }

    #[test]
    fn test_png_round_trip_is_exact() {
        let image = RgbaImage::from_fn(9, 7, |x, y| Rgba([(x * 20) as u8, (y * 30) as u8, 77, 255]));
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::Png, 0.1).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_jpeg_is_rgb_and_within_tolerance() {
        let image = RgbaImage::from_pixel(16, 16, Rgba([200, 100, 50, 255]));
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 0.95).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();

        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        let pixel = decoded.to_rgb8().get_pixel(8, 8).0;
        for (got, want) in pixel.iter().zip([200u8, 100, 50]) {
            assert!(got.abs_diff(want) <= 6, "{got} vs {want}");
        }
    }
}
