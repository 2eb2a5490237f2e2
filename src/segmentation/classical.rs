//! Classical foreground segmentation from pixel statistics
//!
//! Otsu threshold on luminance, morphological cleanup, then the largest connected
//! component is kept as the subject.

use crate::{
    error::{IdPhotoError, Result},
    segmentation::{MaskOutcome, Segmenter},
    types::SegmentationMask,
    utils::color::luminance_plane,
};
use image::{GrayImage, Luma, RgbImage};
use imageproc::{
    contrast::otsu_level,
    distance_transform::Norm,
    morphology,
    region_labelling::{connected_components, Connectivity},
};

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// Parameters of the classical segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicalParams {
    /// Disk radius of the hole-filling closing
    pub closing_radius: u8,
    /// Disk radius of the speck-removing opening
    pub opening_radius: u8,
}

impl Default for ClassicalParams {
    fn default() -> Self {
        Self {
            closing_radius: 3,
            opening_radius: 2,
        }
    }
}

/// Segmenter that needs no learned model
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicalSegmenter {
    params: ClassicalParams,
}

impl ClassicalSegmenter {
    #[must_use]
    pub fn new(params: ClassicalParams) -> Self {
        Self { params }
    }

    /// Binary mask (0/255) with the dimensions of `image`
    ///
    /// A uniform image has no meaningful threshold and yields an all-background mask.
    ///
    /// # Errors
    /// - `image` has a zero dimension
    pub fn compute_mask(&self, image: &RgbImage) -> Result<SegmentationMask> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(IdPhotoError::segmentation(format!(
                "Cannot segment an empty {}x{} image",
                width, height
            )));
        }

        let gray = luminance_plane(image);
        let (min, max) = gray
            .as_raw()
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min == max {
            log::debug!("Uniform luminance {}, producing an empty mask", min);
            return Ok(SegmentationMask::filled((width, height), BACKGROUND));
        }

        let level = otsu_level(&gray);
        let binary = threshold_above(&gray, level);
        log::trace!("Otsu level {} for {}x{} image", level, width, height);

        let closed = morphology::close(&binary, Norm::L2, self.params.closing_radius);
        let cleaned = morphology::open(&closed, Norm::L2, self.params.opening_radius);

        match largest_component(&cleaned) {
            Some(mask) => Ok(SegmentationMask::from_image(mask)),
            None => {
                log::debug!("No component survived cleanup, using the raw threshold mask");
                Ok(SegmentationMask::from_image(binary))
            },
        }
    }
}

impl Segmenter for ClassicalSegmenter {
    fn name(&self) -> &'static str {
        "classical"
    }

    fn segment(&self, image: &RgbImage, _prefer_acceleration: bool) -> Result<MaskOutcome> {
        Ok(MaskOutcome {
            mask: self.compute_mask(image)?,
            accelerated: false,
        })
    }
}

/// Foreground where luminance is strictly above `level`
fn threshold_above(gray: &GrayImage, level: u8) -> GrayImage {
    let mut binary = gray.clone();
    for pixel in binary.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level {
            FOREGROUND
        } else {
            BACKGROUND
        };
    }
    binary
}

/// Keep only the largest 8-connected foreground region, `None` when there is none
fn largest_component(binary: &GrayImage) -> Option<GrayImage> {
    let labels = connected_components(binary, Connectivity::Eight, Luma([BACKGROUND]));

    let label_count = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    if label_count == 0 {
        return None;
    }

    let mut areas = vec![0usize; label_count + 1];
    for pixel in labels.pixels() {
        if let Some(area) = areas.get_mut(pixel.0[0] as usize) {
            *area += 1;
        }
    }

    // Label 0 is background; ties go to the lowest label
    let (largest, _) = areas
        .iter()
        .enumerate()
        .skip(1)
        .fold((0usize, 0usize), |best, (label, &area)| {
            if area > best.1 {
                (label, area)
            } else {
                best
            }
        });
    if largest == 0 {
        return None;
    }

    let (width, height) = binary.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (out, label) in mask.pixels_mut().zip(labels.pixels()) {
        if label.0[0] as usize == largest {
            out.0[0] = FOREGROUND;
        }
    }
    Some(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn image_with_squares() -> RgbImage {
        let mut image = RgbImage::from_pixel(80, 60, Rgb([20, 20, 20]));
        // Large subject
        for y in 10..50 {
            for x in 10..40 {
                image.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        // Smaller bright region, far from the subject
        for y in 20..32 {
            for x in 60..72 {
                image.put_pixel(x, y, Rgb([230, 230, 230]));
            }
        }
        image
    }

    #[test]
    fn test_mask_matches_image_dimensions() {
        let image = image_with_squares();
        let mask = ClassicalSegmenter::default().compute_mask(&image).unwrap();
        assert_eq!(mask.dimensions, image.dimensions());
        assert_eq!(mask.data.len(), 80 * 60);
    }

    #[test]
    fn test_keeps_largest_component_only() {
        let image = image_with_squares();
        let mask = ClassicalSegmenter::default().compute_mask(&image).unwrap();
        let at = |x: u32, y: u32| mask.data[(y * 80 + x) as usize];

        assert_eq!(at(25, 30), 255);
        assert_eq!(at(66, 26), 0);
        assert_eq!(at(2, 2), 0);
    }

    #[test]
    fn test_mask_is_binary() {
        let mut image = image_with_squares();
        for x in 0..80 {
            image.put_pixel(x, 55, Rgb([(x * 3) as u8, 90, 40]));
        }
        let mask = ClassicalSegmenter::default().compute_mask(&image).unwrap();
        assert!(mask.data.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn test_uniform_image_is_degenerate_not_an_error() {
        let image = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        let mask = ClassicalSegmenter::default().compute_mask(&image).unwrap();
        let first = mask.data[0];
        assert!(mask.data.iter().all(|&v| v == first));
    }

    #[test]
    fn test_specks_fall_back_to_threshold_mask() {
        // Isolated single pixels vanish under opening; the raw threshold mask is returned
        let mut image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        image.put_pixel(5, 5, Rgb([255, 255, 255]));
        image.put_pixel(14, 14, Rgb([255, 255, 255]));

        let mask = ClassicalSegmenter::default().compute_mask(&image).unwrap();
        assert_eq!(mask.foreground_pixels(), 2);
    }

    #[test]
    fn test_empty_image_fails() {
        let err = ClassicalSegmenter::default()
            .compute_mask(&RgbImage::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, IdPhotoError::Segmentation(_)));
    }

    #[test]
    fn test_segmenter_is_never_accelerated() {
        let outcome = ClassicalSegmenter::default()
            .segment(&image_with_squares(), true)
            .unwrap();
        assert!(!outcome.accelerated);
    }
}
