//! Scale-to-fit compositing onto a solid background

use crate::error::{IdPhotoError, Result};
use image::{imageops::FilterType, Rgba, RgbaImage};
use tracing::instrument;

/// Opaque RGB background color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const WHITE: Self = Self {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };

    /// Parse a 6-hex-digit color with an optional leading `#`
    ///
    /// # Errors
    /// - Wrong length or non-hex characters
    pub fn parse(hex: &str) -> Result<Self> {
        let digits = hex.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);

        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdPhotoError::composition(format!(
                "Invalid background color '{}' (expected 6 hex digits, e.g. #FFFFFF)",
                hex
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| IdPhotoError::composition(format!("Invalid background color '{}'", hex)))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    #[must_use]
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl std::str::FromStr for BackgroundColor {
    type Err = IdPhotoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Placement of the resized foreground on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitGeometry {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl FitGeometry {
    /// Uniform scale-to-fit of `source` inside `target`, centred with floor division
    ///
    /// Resized sides are rounded and clamped to `1..=target` so the foreground never
    /// overflows the canvas.
    #[must_use]
    pub fn fit(source: (u32, u32), target: (u32, u32)) -> Self {
        let (src_w, src_h) = source;
        let (dst_w, dst_h) = target;
        let scale = (f64::from(dst_w) / f64::from(src_w)).min(f64::from(dst_h) / f64::from(src_h));

        let width = ((f64::from(src_w) * scale).round() as u32).clamp(1, dst_w);
        let height = ((f64::from(src_h) * scale).round() as u32).clamp(1, dst_h);

        Self {
            width,
            height,
            offset_x: (dst_w - width) / 2,
            offset_y: (dst_h - height) / 2,
        }
    }
}

/// Largest accepted canvas side in pixels
///
/// Requests above this are rejected before any buffer is allocated.
pub const MAX_CANVAS_SIDE: u32 = 10_000;

/// Composites a foreground onto a solid canvas of exact size
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    filter: FilterType,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Compositor {
    /// Compositor with a custom resampling filter
    #[must_use]
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Fit `foreground` into a `width` x `height` canvas of `background_hex`
    ///
    /// The result is fully opaque and exactly the requested size.
    ///
    /// # Errors
    /// - Invalid background color
    /// - Non-positive or oversized target dimensions
    /// - Empty foreground
    #[instrument(skip(self, foreground), fields(fg_width = foreground.width(), fg_height = foreground.height()))]
    pub fn compose(
        &self,
        foreground: &RgbaImage,
        background_hex: &str,
        width: i64,
        height: i64,
    ) -> Result<RgbaImage> {
        let color = BackgroundColor::parse(background_hex)?;
        let target = Self::target_size(width, height)?;
        self.compose_with(foreground, color, target)
    }

    /// Same as [`Compositor::compose`] with parsed inputs
    ///
    /// The foreground is resampled with premultiplied alpha, so colors hidden under
    /// fully transparent pixels never bleed into the visible edge.
    ///
    /// # Errors
    /// - Empty foreground
    /// - Zero target dimension or a side above [`MAX_CANVAS_SIDE`]
    pub fn compose_with(
        &self,
        foreground: &RgbaImage,
        color: BackgroundColor,
        target: (u32, u32),
    ) -> Result<RgbaImage> {
        let (fg_w, fg_h) = foreground.dimensions();
        if fg_w == 0 || fg_h == 0 {
            return Err(IdPhotoError::composition(format!(
                "Foreground is empty ({}x{})",
                fg_w, fg_h
            )));
        }
        if target.0 == 0 || target.1 == 0 {
            return Err(IdPhotoError::composition(format!(
                "Target dimensions must be positive, got {}x{}",
                target.0, target.1
            )));
        }
        if target.0 > MAX_CANVAS_SIDE || target.1 > MAX_CANVAS_SIDE {
            return Err(IdPhotoError::composition(format!(
                "Target dimensions {}x{} exceed the {} pixel limit",
                target.0, target.1, MAX_CANVAS_SIDE
            )));
        }

        let geometry = FitGeometry::fit((fg_w, fg_h), target);
        log::debug!(
            "Fitting {}x{} foreground as {}x{} at ({}, {}) on {}x{} {}",
            fg_w,
            fg_h,
            geometry.width,
            geometry.height,
            geometry.offset_x,
            geometry.offset_y,
            target.0,
            target.1,
            color
        );

        let premultiplied = premultiply(foreground);
        let resized = if (geometry.width, geometry.height) == (fg_w, fg_h) {
            premultiplied
        } else {
            image::imageops::resize(&premultiplied, geometry.width, geometry.height, self.filter)
        };

        let mut canvas = RgbaImage::from_pixel(target.0, target.1, color.to_rgba());
        for (x, y, src) in resized.enumerate_pixels() {
            let (cx, cy) = (x + geometry.offset_x, y + geometry.offset_y);
            if cx < target.0 && cy < target.1 {
                let dst = canvas.get_pixel_mut(cx, cy);
                *dst = blend_over(*src, *dst);
            }
        }

        Ok(canvas)
    }

    /// Validate signed request dimensions as a canvas size
    ///
    /// # Errors
    /// - Either dimension is non-positive or above [`MAX_CANVAS_SIDE`]
    pub fn target_size(width: i64, height: i64) -> Result<(u32, u32)> {
        Ok((Self::dimension("width", width)?, Self::dimension("height", height)?))
    }

    fn dimension(name: &str, value: i64) -> Result<u32> {
        if value <= 0 {
            return Err(IdPhotoError::composition(format!(
                "Target {} must be positive, got {}",
                name, value
            )));
        }
        u32::try_from(value)
            .ok()
            .filter(|side| *side <= MAX_CANVAS_SIDE)
            .ok_or_else(|| {
                IdPhotoError::composition(format!(
                    "Target {} {} exceeds the {} pixel limit",
                    name, value, MAX_CANVAS_SIDE
                ))
            })
    }
}

/// Scale color channels by alpha
fn premultiply(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let alpha = u32::from(pixel[3]);
        for channel in &mut pixel.0[..3] {
            *channel = ((u32::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
    out
}

/// Source-over an opaque destination with a premultiplied source
///
/// Resampling ringing can push a channel above its alpha, so the sum is clamped.
#[inline]
fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let inverse = 255 - u32::from(src[3]);
    let mix = |s: u8, d: u8| ((u32::from(s) * 255 + u32::from(d) * inverse + 127) / 255).min(255) as u8;
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}
