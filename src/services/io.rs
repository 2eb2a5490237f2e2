//! Image payload decoding and data-URL encoding
//!
//! Requests carry images as raw base64 or as `data:<mime>;base64,<payload>` URLs, and
//! responses return the encoded result as a data URL.

use crate::{
    config::OutputFormat,
    error::{IdPhotoError, Result},
};
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;

/// Service for decoding request payloads and encoding response payloads
pub struct ImageIOService;

impl ImageIOService {
    /// Decode an image payload (raw base64 or data URL)
    ///
    /// # Errors
    /// - Empty payload, a data URL without a base64 marker, invalid base64 or an
    ///   undecodable image, all reported as `Decode` errors
    ///
    /// # Examples
    /// ```rust
    /// use idphoto::services::ImageIOService;
    ///
    /// assert!(ImageIOService::decode_payload("data:image/png;base64,!!!").is_err());
    /// ```
    pub fn decode_payload(payload: &str) -> Result<DynamicImage> {
        let bytes = Self::decode_base64(payload)?;
        Self::load_from_bytes(&bytes)
    }

    /// Base64 bytes of a payload, with any data-URL header and whitespace removed
    ///
    /// # Errors
    /// - Empty payload, missing `;base64,` marker or invalid base64
    pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
        let trimmed = payload.trim();
        let encoded = if let Some(rest) = trimmed.strip_prefix("data:") {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| IdPhotoError::decode("Data URL has no payload"))?;
            if !header.ends_with(";base64") {
                return Err(IdPhotoError::decode(format!(
                    "Data URL '{}' is not base64 encoded",
                    header
                )));
            }
            data
        } else {
            trimmed
        };

        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        if compact.is_empty() {
            return Err(IdPhotoError::decode("Image payload is empty"));
        }

        general_purpose::STANDARD
            .decode(&compact)
            .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(&compact))
            .map_err(|e| IdPhotoError::decode(format!("Invalid base64 image data: {}", e)))
    }

    /// Decode raw image bytes
    ///
    /// # Errors
    /// - The bytes are not a supported image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| IdPhotoError::decode(format!("Failed to decode image: {}", e)))
    }

    /// Wrap encoded bytes in a `data:image/<format>;base64,` URL
    #[must_use]
    pub fn to_data_url(bytes: &[u8], format: OutputFormat) -> String {
        format!(
            "data:image/{};base64,{}",
            format.mime_subtype(),
            general_purpose::STANDARD.encode(bytes)
        )
    }

    /// Plain base64 of `bytes`
    #[must_use]
    pub fn to_base64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }
}
