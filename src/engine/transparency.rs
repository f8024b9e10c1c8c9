// src/engine/transparency.rs
//
// White-background compositing for destination formats without alpha
// support. Palette sources with a transparency index arrive from the
// decoders already expanded to RGBA, so the alpha path covers them too.

use image::{DynamicImage, RgbImage};

/// True when the decoded buffer carries an alpha channel.
pub fn has_alpha(img: &DynamicImage) -> bool {
    img.color().has_alpha()
}

/// Composite the image onto an opaque white background using its alpha
/// channel as the blend mask, producing an RGB buffer. Sources without
/// alpha are returned unchanged.
pub fn flatten_to_white(img: DynamicImage) -> DynamicImage {
    if !has_alpha(&img) {
        return img;
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        dst.0 = [
            blend_over_white(r, a),
            blend_over_white(g, a),
            blend_over_white(b, a),
        ];
    }

    DynamicImage::ImageRgb8(out)
}

/// out = a*value + (1-a)*255, with rounding.
#[inline]
fn blend_over_white(value: u8, alpha: u8) -> u8 {
    let value = value as u32;
    let alpha = alpha as u32;
    ((value * alpha + 255 * (255 - alpha) + 127) / 255) as u8
}
