// pagesnap Image Codec
// Converts between PNG data URLs and in-memory RGBA bitmaps, and crops regions.
// Stateless; every function is safe to call from any task.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{imageops, ImageFormat, RgbaImage};

use crate::types::errors::CodecError;
use crate::types::tab::CropArea;

/// Decoded raster image, RGBA8, device pixels.
pub type Bitmap = RgbaImage;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Returns the base64 payload of a data URL, or the input when it has no header.
pub fn strip_data_url(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        match encoded.find(',') {
            Some(idx) => &encoded[idx + 1..],
            None => "",
        }
    } else {
        encoded
    }
}

/// Decodes a data URL or bare base64 string into a bitmap.
pub fn decode(encoded: &str) -> Result<Bitmap, CodecError> {
    let bytes = STANDARD
        .decode(strip_data_url(encoded).trim())
        .map_err(|e| CodecError::Base64(e.to_string()))?;
    let image = image::load_from_memory(&bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

/// Encodes a bitmap as a PNG data URL.
pub fn encode(bitmap: &Bitmap) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    bitmap
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&buf)))
}

/// Copies `region` (device pixels) out of `bitmap`.
///
/// The region is clamped to the bitmap bounds; fractional edges are rounded.
/// Fails with [`CodecError::EmptyRegion`] when nothing is left after clamping.
pub fn crop(bitmap: &Bitmap, region: &CropArea) -> Result<Bitmap, CodecError> {
    let (width, height) = bitmap.dimensions();
    let x0 = region.x.round().clamp(0.0, width as f64) as u32;
    let y0 = region.y.round().clamp(0.0, height as f64) as u32;
    let x1 = (region.x + region.width).round().clamp(0.0, width as f64) as u32;
    let y1 = (region.y + region.height).round().clamp(0.0, height as f64) as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(CodecError::EmptyRegion);
    }
    Ok(imageops::crop_imm(bitmap, x0, y0, x1 - x0, y1 - y0).to_image())
}
