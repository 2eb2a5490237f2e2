//! Core data types shared by the pipeline stages

use crate::config::OutputFormat;
use crate::error::{IdPhotoError, Result};
use image::{GrayImage, RgbImage, RgbaImage};
use serde::Serialize;

/// Single-channel foreground mask, 0 = background, 255 = foreground
///
/// A mask always has the dimensions of the image it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Mask data as grayscale values (0-255), row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a mask, checking that the buffer matches the dimensions
    ///
    /// # Errors
    /// - `data.len()` differs from `width * height`
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(IdPhotoError::segmentation(format!(
                "Mask buffer holds {} values, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Create a mask from a grayscale image
    #[must_use]
    pub fn from_image(image: GrayImage) -> Self {
        let dimensions = image.dimensions();
        Self {
            data: image.into_raw(),
            dimensions,
        }
    }

    /// Uniform mask where every pixel has the same value
    #[must_use]
    pub fn filled(dimensions: (u32, u32), value: u8) -> Self {
        Self {
            data: vec![value; dimensions.0 as usize * dimensions.1 as usize],
            dimensions,
        }
    }

    /// Number of pixels marked as foreground (value > 127)
    #[must_use]
    pub fn foreground_pixels(&self) -> usize {
        self.data.iter().filter(|&&v| v > 127).count()
    }

    /// Fraction of the mask marked as foreground
    #[must_use]
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.foreground_pixels() as f32 / self.data.len() as f32
    }

    /// Build an RGBA image from `image` using this mask as the alpha channel
    ///
    /// Color channels are copied unchanged, including under fully transparent pixels.
    ///
    /// # Errors
    /// - Mask dimensions differ from the image dimensions
    pub fn apply_to(&self, image: &RgbImage) -> Result<RgbaImage> {
        if image.dimensions() != self.dimensions {
            return Err(IdPhotoError::segmentation(format!(
                "Image ({}x{}) and mask ({}x{}) dimensions do not match",
                image.width(),
                image.height(),
                self.dimensions.0,
                self.dimensions.1
            )));
        }

        let (width, height) = self.dimensions;
        let mut rgba = RgbaImage::new(width, height);
        for ((out, src), &alpha) in rgba.pixels_mut().zip(image.pixels()).zip(&self.data) {
            *out = image::Rgba([src[0], src[1], src[2], alpha]);
        }
        Ok(rgba)
    }
}

/// Which segmentation tier produced a foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationTier {
    /// External learned model
    LearnedModel,
    /// Otsu threshold + morphology + largest component
    Classical,
    /// Every tier failed; the original image with full alpha
    OpaquePassthrough,
}

impl std::fmt::Display for SegmentationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LearnedModel => write!(f, "learned-model"),
            Self::Classical => write!(f, "classical"),
            Self::OpaquePassthrough => write!(f, "opaque-passthrough"),
        }
    }
}

/// RGBA foreground produced by the segmentation engine
#[derive(Debug, Clone)]
pub struct Foreground {
    /// Source colors with the segmentation result as alpha
    pub image: RgbaImage,
    /// Tier that produced the alpha channel
    pub tier: SegmentationTier,
    /// Whether a hardware-accelerated model produced the mask
    pub accelerated: bool,
}

/// Per-stage timings for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingTimings {
    pub decode_ms: u64,
    pub segmentation_ms: u64,
    pub refine_ms: u64,
    pub compose_ms: u64,
    pub enhance_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Get a breakdown of time spent in each stage as percentages of the total
    #[must_use]
    pub fn breakdown_percentages(&self) -> Vec<(&'static str, f64)> {
        if self.total_ms == 0 {
            return Vec::new();
        }
        let total = self.total_ms as f64;
        [
            ("decode", self.decode_ms),
            ("segmentation", self.segmentation_ms),
            ("refine", self.refine_ms),
            ("compose", self.compose_ms),
            ("enhance", self.enhance_ms),
            ("encode", self.encode_ms),
        ]
        .into_iter()
        .map(|(stage, ms)| (stage, ms as f64 / total * 100.0))
        .collect()
    }
}

/// Encoded result of a successful request
#[derive(Debug, Clone)]
pub struct PhotoOutput {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// Format of `bytes`
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Whether hardware acceleration was actually used
    pub used_acceleration: bool,
    /// Segmentation tier that produced the cutout
    pub tier: SegmentationTier,
    pub timings: ProcessingTimings,
}

impl PhotoOutput {
    /// Size of the encoded output in bytes
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.bytes.len()
    }
}

/// Outcome of one request: exactly one of success or failure
#[derive(Debug)]
pub enum ProcessingResult {
    Success(PhotoOutput),
    Failure(IdPhotoError),
}

impl ProcessingResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<PhotoOutput>> for ProcessingResult {
    fn from(result: Result<PhotoOutput>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(error) => Self::Failure(error),
        }
    }
}
