//! Image decoding and color normalization.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than image crate),
//! falls back to image crate for other formats. Every decoded image is
//! flattened to 8-bit RGB before hashing so that alpha, palette and
//! grayscale inputs always hash the same way.

use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage, Rgba};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// JPEG end-of-image marker
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Decodes raw image bytes into a normalized RGB image
pub struct ImageDecoder;

impl ImageDecoder {
    /// Decode bytes and flatten them to RGB8.
    pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, HashError> {
        let image = Self::decode(bytes)?;

        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }

        Ok(flatten_to_rgb(&image))
    }

    /// Decode bytes using the fastest decoder for the detected format.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, HashError> {
        if bytes.is_empty() {
            return Err(HashError::EmptyInput);
        }

        let format = image::guess_format(bytes).map_err(|_| HashError::UnsupportedFormat)?;

        match format {
            ImageFormat::Jpeg => {
                Self::check_jpeg_complete(bytes)?;
                Self::decode_jpeg(bytes).or_else(|_| Self::decode_fallback(bytes))
            }
            _ => Self::decode_fallback(bytes),
        }
    }

    /// Reject JPEG data that stops before its end-of-image marker.
    ///
    /// Both decoders fill missing scan data with grey instead of failing,
    /// so truncation has to be caught up front. Only the tail is checked:
    /// embedded EXIF thumbnails carry their own EOI markers.
    fn check_jpeg_complete(bytes: &[u8]) -> Result<(), HashError> {
        let end = bytes.iter().rposition(|&b| b != 0x00).map_or(0, |i| i + 1);

        if !bytes[..end].ends_with(&JPEG_EOI) {
            return Err(HashError::Decode {
                reason: "truncated JPEG (no end-of-image marker)".to_string(),
            });
        }
        Ok(())
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, HashError> {
        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder.decode().map_err(|e| HashError::Decode {
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| HashError::Decode {
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;

        let out_colorspace = decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB);

        let image = match out_colorspace {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        HashError::Decode {
                            reason: "Failed to create RGB buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        HashError::Decode {
                            reason: "Failed to create RGBA buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| {
                        HashError::Decode {
                            reason: "Failed to create Luma buffer".to_string(),
                        }
                    })?;
                DynamicImage::ImageLuma8(buffer)
            }
            _ => return Self::decode_fallback(bytes),
        };

        Ok(image)
    }

    fn decode_fallback(bytes: &[u8]) -> Result<DynamicImage, HashError> {
        image::load_from_memory(bytes).map_err(|e| HashError::Decode {
            reason: e.to_string(),
        })
    }
}

/// Flatten any decoded image to opaque 8-bit RGB.
///
/// Pixels with alpha are composited over white, so fully transparent
/// pixels hash the same whatever color they carry.
pub fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
