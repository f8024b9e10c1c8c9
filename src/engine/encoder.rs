// src/engine/encoder.rs
//
// Format-specific encoders, dispatched from the capability entry:
// JPEG via mozjpeg, PNG via image crate + oxipng, WebP via libwebp,
// TIFF via the tiff crate (LZW), BMP/GIF/ICO via image crate defaults.

use crate::engine::common::run_guarded;
use crate::engine::MAX_DIMENSION;
use crate::error::{ConvertError, Result};
use crate::formats::{CapabilityEntry, CompressionHint, OutputFormat};
use image::{DynamicImage, ImageFormat};
use img_parts::{jpeg::Jpeg, png::Png, ImageICC};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;
use std::io::Cursor;

/// Quality applied when the caller does not set one (JPEG/WebP).
pub const DEFAULT_QUALITY: u8 = 95;

/// Encode the image for the given capability entry.
///
/// `quality` is honored only for formats whose entry advertises the quality
/// capability; `icc` is re-embedded where the container supports it
/// (JPEG/PNG/WebP).
pub fn encode(
    img: &DynamicImage,
    entry: &CapabilityEntry,
    quality: Option<u8>,
    icc: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let quality = quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100);
    match entry.format {
        OutputFormat::Jpeg => encode_jpeg(img, quality, icc),
        OutputFormat::Png => encode_png(img, icc),
        OutputFormat::Webp => encode_webp(img, quality, webp_method(entry), icc),
        OutputFormat::Tiff => encode_tiff_lzw(img),
        OutputFormat::Bmp => encode_with_image_crate(img, ImageFormat::Bmp, "bmp"),
        OutputFormat::Gif => encode_with_image_crate(img, ImageFormat::Gif, "gif"),
        OutputFormat::Ico => encode_with_image_crate(img, ImageFormat::Ico, "ico"),
    }
}

fn webp_method(entry: &CapabilityEntry) -> i32 {
    match entry.compression {
        CompressionHint::Method(method) => i32::from(method),
        _ => 4,
    }
}

/// Encode to JPEG using mozjpeg: forced 3-channel RGB, progressive scan,
/// optimized entropy coding.
pub fn encode_jpeg(img: &DynamicImage, quality: u8, icc: Option<&[u8]>) -> Result<Vec<u8>> {
    run_guarded("encode:jpeg", || {
        // JPEG has no alpha; force RGB (zero-copy when already RGB8)
        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (width, height) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if width == 0 || height == 0 {
            return Err(ConvertError::encode_failed("jpeg", "empty image"));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ConvertError::dimension_exceeds_limit(
                width.max(height),
                MAX_DIMENSION,
            ));
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

        let estimated_size = (width as usize * height as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        let encoded = {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                ConvertError::encode_failed("jpeg", format!("failed to start compress: {e:?}"))
            })?;

            let stride = width as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    ConvertError::encode_failed("jpeg", format!("failed to write scanlines: {e:?}"))
                })?;
            }

            writer.finish().map_err(|e| {
                ConvertError::encode_failed("jpeg", format!("failed to finish: {e:?}"))
            })?;

            output
        };

        match icc {
            Some(icc_data) => embed_icc_jpeg(encoded, icc_data),
            None => Ok(encoded),
        }
    })
}

/// Encode to PNG via the image crate, then run a lossless oxipng
/// recompression pass.
pub fn encode_png(img: &DynamicImage, icc: Option<&[u8]>) -> Result<Vec<u8>> {
    run_guarded("encode:png", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| ConvertError::encode_failed("png", format!("encode failed: {e}")))?;

        let mut options = oxipng::Options::from_preset(2);
        // Keep ancillary chunks; stripping is not this tool's business
        options.strip = oxipng::StripChunks::None;

        let optimized = oxipng::optimize_from_memory(&buf, &options)
            .map_err(|e| ConvertError::encode_failed("png", format!("optimization failed: {e}")))?;

        match icc {
            Some(icc_data) => embed_icc_png(optimized, icc_data),
            None => Ok(optimized),
        }
    })
}

/// Encode to WebP. Alpha is preserved; the compression method comes from
/// the capability hint (6 = best effort).
pub fn encode_webp(
    img: &DynamicImage,
    quality: u8,
    method: i32,
    icc: Option<&[u8]>,
) -> Result<Vec<u8>> {
    run_guarded("encode:webp", || {
        let has_alpha = img.color().has_alpha();

        let encoded = if has_alpha {
            let rgba: Cow<'_, image::RgbaImage> = match img {
                DynamicImage::ImageRgba8(rgba_img) => Cow::Borrowed(rgba_img),
                _ => Cow::Owned(img.to_rgba8()),
            };
            let (width, height) = rgba.dimensions();
            let encoder = webp::Encoder::from_rgba(&rgba, width, height);
            encode_webp_advanced(encoder, quality, method)?
        } else {
            let rgb: Cow<'_, image::RgbImage> = match img {
                DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
                _ => Cow::Owned(img.to_rgb8()),
            };
            let (width, height) = rgb.dimensions();
            let encoder = webp::Encoder::from_rgb(&rgb, width, height);
            encode_webp_advanced(encoder, quality, method)?
        };

        match icc {
            Some(icc_data) => embed_icc_webp(encoded, icc_data),
            None => Ok(encoded),
        }
    })
}

fn encode_webp_advanced(encoder: webp::Encoder<'_>, quality: u8, method: i32) -> Result<Vec<u8>> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| ConvertError::encode_failed("webp", "failed to create WebPConfig"))?;
    config.quality = quality as f32;
    config.method = method.clamp(0, 6);

    let mem = encoder
        .encode_advanced(&config)
        .map_err(|e| ConvertError::encode_failed("webp", format!("encode failed: {e:?}")))?;
    Ok(mem.to_vec())
}

/// Encode to TIFF with LZW compression via the tiff crate.
pub fn encode_tiff_lzw(img: &DynamicImage) -> Result<Vec<u8>> {
    use tiff::encoder::{colortype, compression::Lzw, TiffEncoder};

    run_guarded("encode:tiff", || {
        let map_err =
            |e: tiff::TiffError| ConvertError::encode_failed("tiff", format!("encode failed: {e}"));

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).map_err(map_err)?;
            match img {
                DynamicImage::ImageLuma8(gray) => {
                    let (w, h) = gray.dimensions();
                    encoder
                        .write_image_with_compression::<colortype::Gray8, _>(
                            w,
                            h,
                            Lzw,
                            gray.as_raw(),
                        )
                        .map_err(map_err)?;
                }
                DynamicImage::ImageRgb8(rgb) => {
                    let (w, h) = rgb.dimensions();
                    encoder
                        .write_image_with_compression::<colortype::RGB8, _>(w, h, Lzw, rgb.as_raw())
                        .map_err(map_err)?;
                }
                DynamicImage::ImageRgba8(rgba) => {
                    let (w, h) = rgba.dimensions();
                    encoder
                        .write_image_with_compression::<colortype::RGBA8, _>(
                            w,
                            h,
                            Lzw,
                            rgba.as_raw(),
                        )
                        .map_err(map_err)?;
                }
                other => {
                    // Remaining layouts (LumaA8, 16-bit) go through RGB(A)8
                    if other.color().has_alpha() {
                        let rgba = other.to_rgba8();
                        let (w, h) = rgba.dimensions();
                        encoder
                            .write_image_with_compression::<colortype::RGBA8, _>(
                                w,
                                h,
                                Lzw,
                                rgba.as_raw(),
                            )
                            .map_err(map_err)?;
                    } else {
                        let rgb = other.to_rgb8();
                        let (w, h) = rgb.dimensions();
                        encoder
                            .write_image_with_compression::<colortype::RGB8, _>(
                                w,
                                h,
                                Lzw,
                                rgb.as_raw(),
                            )
                            .map_err(map_err)?;
                    }
                }
            }
        }
        Ok(cursor.into_inner())
    })
}

/// Encode BMP/GIF/ICO with image crate defaults. Pixel layout is normalized
/// to RGB(A)8 first, which every one of these encoders accepts.
fn encode_with_image_crate(
    img: &DynamicImage,
    format: ImageFormat,
    name: &'static str,
) -> Result<Vec<u8>> {
    run_guarded("encode:image", || {
        let normalized: Cow<'_, DynamicImage> = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
            other if other.color().has_alpha() => {
                Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8()))
            }
            other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
        };

        let mut buf = Vec::new();
        normalized
            .write_to(&mut Cursor::new(&mut buf), format)
            .map_err(|e| ConvertError::encode_failed(name, format!("encode failed: {e}")))?;
        Ok(buf)
    })
}

/// Embed an ICC profile into JPEG data as an APP2 segment.
pub fn embed_icc_jpeg(jpeg_data: Vec<u8>, icc: &[u8]) -> Result<Vec<u8>> {
    use img_parts::jpeg::{markers::APP2, JpegSegment};
    use img_parts::Bytes;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_data))
        .map_err(|e| ConvertError::encode_failed("jpeg", format!("failed to parse for ICC: {e}")))?;

    let mut marker_data = Vec::with_capacity(14 + icc.len());
    marker_data.extend_from_slice(b"ICC_PROFILE\0");
    marker_data.push(1); // chunk index
    marker_data.push(1); // chunk count
    marker_data.extend_from_slice(icc);

    let segment = JpegSegment::new_with_contents(APP2, Bytes::from(marker_data));
    jpeg.segments_mut().insert(0, segment);

    let mut output = Vec::new();
    jpeg.encoder()
        .write_to(&mut output)
        .map_err(|e| ConvertError::encode_failed("jpeg", format!("failed to write ICC: {e}")))?;
    Ok(output)
}

/// Embed an ICC profile into PNG data (iCCP chunk).
pub fn embed_icc_png(png_data: Vec<u8>, icc: &[u8]) -> Result<Vec<u8>> {
    use img_parts::Bytes;

    let mut png = Png::from_bytes(Bytes::from(png_data))
        .map_err(|e| ConvertError::encode_failed("png", format!("failed to parse for ICC: {e}")))?;
    png.set_icc_profile(Some(Bytes::from(icc.to_vec())));

    let mut output = Vec::new();
    png.encoder()
        .write_to(&mut output)
        .map_err(|e| ConvertError::encode_failed("png", format!("failed to write ICC: {e}")))?;
    Ok(output)
}

/// Embed an ICC profile into WebP data (ICCP chunk).
pub fn embed_icc_webp(webp_data: Vec<u8>, icc: &[u8]) -> Result<Vec<u8>> {
    use img_parts::webp::WebP;
    use img_parts::Bytes;

    let mut container = WebP::from_bytes(Bytes::from(webp_data))
        .map_err(|e| ConvertError::encode_failed("webp", format!("failed to parse for ICC: {e}")))?;
    container.set_icc_profile(Some(Bytes::from(icc.to_vec())));

    let mut output = Vec::new();
    container
        .encoder()
        .write_to(&mut output)
        .map_err(|e| ConvertError::encode_failed("webp", format!("failed to write ICC: {e}")))?;
    Ok(output)
}
