//! Virtual clothing overlay
//!
//! Garment overlay is part of the request contract but no implementation ships with
//! this crate. Every request for it is declined explicitly so callers can tell
//! "declined" apart from "applied".

use crate::error::{IdPhotoError, Result};
use image::RgbaImage;

/// Outcome reported for the clothing step of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClothingStatus {
    /// No garment was requested
    NotRequested,
    /// A garment was requested and applied
    Applied,
    /// A garment was requested but the capability declined it
    Unavailable,
}

impl ClothingStatus {
    /// Value reported in `featuresUsed.clothingChange`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotRequested => "none",
            Self::Applied => "applied",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Clothing overlay capability
#[derive(Debug, Clone, Copy, Default)]
pub struct ClothingOverlay;

impl ClothingOverlay {
    /// Apply garment `clothing_type` to `image`
    ///
    /// # Errors
    /// - Always `CapabilityUnavailable`
    pub fn apply(&self, _image: &RgbaImage, clothing_type: &str) -> Result<RgbaImage> {
        Err(IdPhotoError::capability_unavailable(
            "clothing overlay",
            format!("garment '{}' cannot be applied: no overlay engine available", clothing_type),
        ))
    }

    /// Apply the requested garment if any, passing the image through when declined
    #[must_use]
    pub fn apply_optional(&self, image: RgbaImage, clothing_type: Option<&str>) -> (RgbaImage, ClothingStatus) {
        let Some(kind) = clothing_type.map(str::trim).filter(|k| !k.is_empty()) else {
            return (image, ClothingStatus::NotRequested);
        };

        match self.apply(&image, kind) {
            Ok(dressed) => (dressed, ClothingStatus::Applied),
            Err(e) => {
                log::info!("Clothing overlay declined: {}", e);
                (image, ClothingStatus::Unavailable)
            },
        }
    }
}
