// src/engine/resize.rs
//
// Best-fit dimension math and high-quality resize. The fast path goes
// through fast_image_resize (SIMD Lanczos3, premultiplied alpha); the image
// crate serves as fallback when fir rejects a buffer.

use crate::error::{ConvertError, Result};
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use fast_image_resize::images::Image;
use image::imageops::FilterType;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

/// Best-fit dimensions inside a target box, preserving aspect ratio.
///
/// scale = min(target_w/src_w, target_h/src_h); the scale may exceed 1
/// (upscaling). Both results are rounded and clamped to >= 1; the result
/// never exceeds the box and matches it on at least one axis.
pub fn calc_fit_dimensions(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    let scale_w = target_width as f64 / src_width as f64;
    let scale_h = target_height as f64 / src_height as f64;
    let scale = scale_w.min(scale_h);
    let width = ((src_width as f64 * scale).round() as u32).max(1);
    let height = ((src_height as f64 * scale).round() as u32).max(1);
    (width, height)
}

fn lanczos3_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

/// Resize with Lanczos3. Takes ownership of the buffer: RGB8/RGBA8/Luma8/
/// LumaA8 resize in their native layout, everything else converts to RGBA8.
pub fn fast_resize(img: DynamicImage, dst_width: u32, dst_height: u32) -> Result<DynamicImage> {
    let src_width = img.width();
    let src_height = img.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ConvertError::resize_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    let (pixel_type, src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageLuma8(gray) => (PixelType::U8, gray.into_raw()),
        DynamicImage::ImageLumaA8(gray_alpha) => (PixelType::U8x2, gray_alpha.into_raw()),
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    resize_impl(
        src_width, src_height, src_pixels, pixel_type, dst_width, dst_height,
    )
    .map_err(|reason| {
        ConvertError::resize_failed((src_width, src_height), (dst_width, dst_height), reason)
    })
}

fn resize_impl(
    src_width: u32,
    src_height: u32,
    mut src_pixels: Vec<u8>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let required_bytes = (src_width as usize)
        .checked_mul(src_height as usize)
        .and_then(|pixels| pixels.checked_mul(pixel_type.size()))
        .ok_or_else(|| "image buffer size overflow during resize".to_string())?;

    if src_pixels.len() < required_bytes {
        return Err(format!(
            "source buffer too small: expected {required_bytes} bytes, got {}",
            src_pixels.len()
        ));
    }

    let primary = match Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        pixel_type,
    ) {
        Ok(src_image) => resize_with_source(src_image, pixel_type, dst_width, dst_height),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            // fir requires aligned buffers; copy into one it allocates itself
            let mut aligned = Image::new(src_width, src_height, pixel_type);
            aligned
                .buffer_mut()
                .copy_from_slice(&src_pixels[..required_bytes]);
            resize_with_source(aligned, pixel_type, dst_width, dst_height)
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    match primary {
        Ok(img) => Ok(img),
        Err(err) => resize_fallback(
            &src_pixels,
            src_width,
            src_height,
            pixel_type,
            dst_width,
            dst_height,
        )
        .map_err(|fallback_err| format!("{err}; image crate fallback failed: {fallback_err}")),
    }
}

fn resize_with_source(
    mut src_image: Image<'_>,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let mut dst_image = Image::new(dst_width, dst_height, pixel_type);

    // Alpha layouts must premultiply before convolution or dark fringes
    // bleed in from transparent neighbors.
    let premultiply = matches!(pixel_type, PixelType::U8x2 | PixelType::U8x4);
    let mul_div = MulDiv::default();
    if premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &lanczos3_options())
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    rebuild_image(pixel_type, dst_width, dst_height, dst_pixels)
}

fn resize_fallback(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let filter = FilterType::Lanczos3;
    match pixel_type {
        PixelType::U8 => {
            let gray = GrayImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build gray image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageLuma8(image::imageops::resize(
                &gray, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x2 => {
            let gray_alpha = GrayAlphaImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build gray-alpha image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageLumaA8(image::imageops::resize(
                &gray_alpha,
                dst_width,
                dst_height,
                filter,
            )))
        }
        PixelType::U8x3 => {
            let rgb = RgbImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgb8(image::imageops::resize(
                &rgb, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x4 => {
            let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgba8(image::imageops::resize(
                &rgba, dst_width, dst_height, filter,
            )))
        }
        _ => Err("fallback resize supports only 8-bit pixel layouts".to_string()),
    }
}

fn rebuild_image(
    pixel_type: PixelType,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
) -> std::result::Result<DynamicImage, String> {
    match pixel_type {
        PixelType::U8 => GrayImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| "failed to create gray image from resized data".to_string()),
        PixelType::U8x2 => GrayAlphaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageLumaA8)
            .ok_or_else(|| "failed to create gray-alpha image from resized data".to_string()),
        PixelType::U8x3 => RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to create rgb image from resized data".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to create rgba image from resized data".to_string()),
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}
