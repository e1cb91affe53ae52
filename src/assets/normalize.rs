//! Image normalization: decode, downscale, re-encode.
//!
//! DESIGN
//! ======
//! Raw generated rasters are hundreds of KiB each and would exhaust the store
//! quota after a handful of subjects. Every externally produced image is
//! therefore decoded, downscaled to `max_width` (aspect ratio kept, never
//! upscaled), flattened to RGB and re-encoded as JPEG. If the encoded data URI
//! is still above `max_payload_bytes`, quality is stepped down until it fits
//! or the floor is reached.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use super::datauri;

pub const DEFAULT_MAX_WIDTH: u32 = 160;
pub const DEFAULT_QUALITY: u8 = 60;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;
/// Smallest usable payload ceiling; below this even a tiny JPEG data URI
/// cannot fit.
pub const MIN_MAX_PAYLOAD_BYTES: usize = 1024;

const QUALITY_STEP: u8 = 15;
const MIN_QUALITY: u8 = 10;
const OUTPUT_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub max_width: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Ceiling on the encoded data URI length.
    pub max_payload_bytes: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { max_width: DEFAULT_MAX_WIDTH, quality: DEFAULT_QUALITY, max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("normalized payload still {size} bytes at minimum quality (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// A normalized image, ready to store.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

/// Normalize raw image bytes (PNG, JPEG, WebP, GIF) into a bounded JPEG data URI.
///
/// # Errors
///
/// Returns `Decode` if the bytes are not a supported image, `Encode` if JPEG
/// encoding fails, or `PayloadTooLarge` if the result cannot be brought under
/// the payload ceiling.
pub fn normalize_image(bytes: &[u8], opts: NormalizeOptions) -> Result<NormalizedImage, NormalizeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| NormalizeError::Decode(e.to_string()))?;

    let (width, height) = target_dimensions(decoded.width(), decoded.height(), opts.max_width);
    let resized = if width == decoded.width() {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };
    let rgb = resized.to_rgb8();

    let mut quality = opts.quality.clamp(1, 100);
    loop {
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality)
            .encode_image(&rgb)
            .map_err(|e| NormalizeError::Encode(e.to_string()))?;
        let data_uri = datauri::encode(OUTPUT_MIME, &buf);

        if data_uri.len() <= opts.max_payload_bytes {
            return Ok(NormalizedImage { data_uri, width, height, quality });
        }
        if quality <= MIN_QUALITY {
            return Err(NormalizeError::PayloadTooLarge { size: data_uri.len(), limit: opts.max_payload_bytes });
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
}

/// Scale `(width, height)` down to `max_width`, keeping aspect ratio.
fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width)) / u64::from(width);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    (max_width, scaled)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
