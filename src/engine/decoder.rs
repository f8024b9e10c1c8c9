// src/engine/decoder.rs
//
// Decode routing: JPEG via mozjpeg, PNG via zune-png, WebP via libwebp,
// everything else through the image crate. Also hosts the EXIF orientation
// probe and the decompression-bomb guards.

use crate::engine::common::run_guarded;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::{ConvertError, Result};
#[cfg(test)]
use image::GenericImageView;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

/// Detect the input format from magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - header-level dimension guard first
/// - detect format once (magic bytes)
/// - route JPEG/PNG/WebP to their dedicated decoders, the rest to the
///   image crate
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    ensure_dimensions_safe(bytes)?;
    match detect_format(bytes) {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes),
        Some(ImageFormat::Png) => decode_png_zune(bytes),
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes),
        _ => decode_with_image_crate(bytes),
    }
}

/// Decode JPEG using mozjpeg (libjpeg-turbo), significantly faster than the
/// pure Rust decoder.
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> Result<DynamicImage> {
    run_guarded("decode:jpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(ConvertError::decode_failed("jpeg: missing EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            ConvertError::decode_failed(format!("jpeg: decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress
            .rgb()
            .map_err(|e| ConvertError::decode_failed(format!("jpeg: rgb conversion failed: {e:?}")))?;

        let width = decompress.width();
        let height = decompress.height();
        check_dimensions(width as u32, height as u32)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            ConvertError::decode_failed(format!("jpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat: Vec<u8> = pixels.into_iter().flatten().collect();

        RgbImage::from_raw(width as u32, height as u32, flat)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| ConvertError::decode_failed("jpeg: failed to build image from raw data"))
    })
}

/// Decode PNG using zune-png. 16-bit inputs are stripped to 8-bit; palette
/// images arrive expanded to RGB(A).
pub fn decode_png_zune(data: &[u8]) -> Result<DynamicImage> {
    run_guarded("decode:png", || {
        let options = DecoderOptions::default().png_set_strip_to_8bit(true);
        let mut decoder = PngDecoder::new_with_options(Cursor::new(data), options);
        let pixels = decoder
            .decode()
            .map_err(|e| ConvertError::decode_failed(format!("png: decode failed: {e}")))?;

        let info = decoder
            .info()
            .ok_or_else(|| ConvertError::decode_failed("png: missing header info"))?;
        let width = info.width as u32;
        let height = info.height as u32;
        check_dimensions(width, height)?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(ConvertError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| ConvertError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA | ColorSpace::YCbCr | ColorSpace::BGRA | ColorSpace::ARGB => {
                RgbaImage::from_raw(width, height, buf)
                    .map(DynamicImage::ImageRgba8)
                    .ok_or_else(|| ConvertError::decode_failed("png: failed to build RGBA image"))?
            }
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| ConvertError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(ConvertError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        Ok(img)
    })
}

/// Decode WebP using libwebp. Animated WebP falls back to the image crate,
/// which decodes the first frame.
pub fn decode_webp_libwebp(data: &[u8]) -> Result<DynamicImage> {
    run_guarded("decode:webp", || {
        let features = BitstreamFeatures::new(data)
            .ok_or_else(|| ConvertError::decode_failed("webp: failed to read bitstream features"))?;

        if features.has_animation() {
            return image::load_from_memory(data).map_err(|e| {
                ConvertError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoded = WebPDecoder::new(data)
            .decode()
            .ok_or_else(|| ConvertError::decode_failed("webp: decode failed"))?;
        check_dimensions(decoded.width(), decoded.height())?;

        Ok(decoded.to_image())
    })
}

/// Decode the remaining formats (GIF, BMP, TIFF, ICO, PNM, ...) through the
/// image crate.
pub fn decode_with_image_crate(data: &[u8]) -> Result<DynamicImage> {
    run_guarded("decode:image", || {
        image::load_from_memory(data)
            .map_err(|e| ConvertError::decode_failed(format!("decode failed: {e}")))
    })
}

/// Check decoded dimensions against the bomb guards.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ConvertError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(ConvertError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and reject images whose header already announces
/// unsafe dimensions, before any pixel allocation.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> Result<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

/// Extract the EXIF Orientation tag (1-8). Returns None if missing or invalid.
pub fn detect_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    // Can be stored as Short or Long; get_uint covers both
    let orientation = field.value.get_uint(0)? as u16;
    if (1..=8).contains(&orientation) {
        Some(orientation)
    } else {
        None
    }
}
