//! # Image Loading and Preparation
//!
//! Loads photos from file paths, data URIs, or raw base64 strings and
//! prepares them for embedding. Oversized photos are downscaled to a
//! bounded pixel width and re-encoded as JPEG so a 20-photo report stays a
//! reasonable file size; JPEGs already within bounds pass through without
//! re-encoding. PNG transparency is flattened (the report layout has white
//! paper behind every photo anyway).

use std::io::Cursor;

use crate::error::Error;

/// Photos wider than this are downscaled before embedding.
pub const MAX_WIDTH_PX: u32 = 800;
/// JPEG re-encode quality for downscaled photos.
pub const JPEG_QUALITY: u8 = 70;

/// An image ready for embedding: final bytes plus pixel dimensions, from
/// which the drawing's print height is derived.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub format: PreparedFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreparedFormat {
    Jpeg,
    Png,
}

impl PreparedImage {
    /// The media part extension for this image.
    pub fn extension(&self) -> &'static str {
        match self.format {
            PreparedFormat::Jpeg => "jpeg",
            PreparedFormat::Png => "png",
        }
    }
}

/// Resolve a photo source string to raw bytes.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` — data URI
/// - File path (absolute or relative) — reads from disk
/// - Raw base64-encoded image data
pub fn load_photo(src: &str) -> Result<Vec<u8>, Error> {
    // Data URI: data:image/jpeg;base64,/9j/4AAQ...
    if src.starts_with("data:image/") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| Error::Image("invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // File path. Only match explicit path prefixes to avoid treating
    // base64 strings (which contain '/') as file paths.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src)
            .map_err(|e| Error::Image(format!("failed to read photo '{}': {}", src, e)));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input)
        .map_err(|e| Error::Image(format!("base64 decode error: {}", e)))
}

/// Decode, bound, and re-encode photo bytes for embedding.
pub fn prepare_image(data: &[u8]) -> Result<PreparedImage, Error> {
    if data.len() < 4 {
        return Err(Error::Image("image data too short".to_string()));
    }
    if !is_jpeg(data) && !is_png(data) {
        return Err(Error::Image(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ));
    }

    // Small JPEGs embed as-is; only the dimensions are read.
    if is_jpeg(data) {
        let (width, height) = read_dimensions(data)?;
        if width <= MAX_WIDTH_PX {
            return Ok(PreparedImage {
                bytes: data.to_vec(),
                width_px: width,
                height_px: height,
                format: PreparedFormat::Jpeg,
            });
        }
    }

    let decoded = image::load_from_memory(data)
        .map_err(|e| Error::Image(format!("failed to decode image: {}", e)))?;
    // Flatten any alpha; the JPEG encoder takes RGB only.
    let mut rgb = decoded.to_rgb8();

    if rgb.width() > MAX_WIDTH_PX {
        let ratio = MAX_WIDTH_PX as f64 / rgb.width() as f64;
        let new_height = ((rgb.height() as f64) * ratio).round().max(1.0) as u32;
        rgb = image::imageops::resize(
            &rgb,
            MAX_WIDTH_PX,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );
    }

    let (width, height) = (rgb.width(), rgb.height());
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), width, height, image::ColorType::Rgb8)
        .map_err(|e| Error::Image(format!("failed to encode JPEG: {}", e)))?;

    Ok(PreparedImage {
        bytes: buf,
        width_px: width,
        height_px: height,
        format: PreparedFormat::Jpeg,
    })
}

/// Read dimensions without decoding pixels.
fn read_dimensions(data: &[u8]) -> Result<(u32, u32), Error> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::Image(format!("format detection error: {}", e)))?
        .into_dimensions()
        .map_err(|e| Error::Image(format!("failed to read image dimensions: {}", e)))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |_, _| image::Rgba([200, 10, 10, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn test_small_jpeg_passes_through() {
        let data = encode_jpeg(4, 2);
        let prepared = prepare_image(&data).unwrap();
        assert_eq!(prepared.bytes, data);
        assert_eq!((prepared.width_px, prepared.height_px), (4, 2));
        assert_eq!(prepared.format, PreparedFormat::Jpeg);
    }

    #[test]
    fn test_png_reencoded_as_jpeg() {
        let prepared = prepare_image(&encode_png(3, 3)).unwrap();
        assert_eq!(prepared.format, PreparedFormat::Jpeg);
        assert!(is_jpeg(&prepared.bytes));
        assert_eq!((prepared.width_px, prepared.height_px), (3, 3));
    }

    #[test]
    fn test_oversized_image_downscaled() {
        let prepared = prepare_image(&encode_jpeg(MAX_WIDTH_PX * 2, 600)).unwrap();
        assert_eq!(prepared.width_px, MAX_WIDTH_PX);
        assert_eq!(prepared.height_px, 300);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(prepare_image(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
        assert!(prepare_image(&[0x00]).is_err());
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(load_photo("data:image/png;base64").is_err());
    }

    #[test]
    fn test_base64_data_uri_round_trip() {
        use base64::Engine;
        let png = encode_png(1, 1);
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        let data_uri = format!("data:image/png;base64,{}", b64);
        let loaded = load_photo(&data_uri).unwrap();
        assert_eq!(loaded, png);
    }
}
