// src/engine/orient.rs
//
// EXIF orientation normalization: apply the Orientation tag (1-8) by
// physically rotating/flipping pixels. Outputs are re-encoded from pixels,
// so no orientation metadata survives and re-running is a no-op.

use image::DynamicImage;

/// Transform the image to its upright orientation.
/// Values outside 1-8 (and 1 itself) leave the image untouched.
pub fn normalize_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(), // transpose
        6 => img.rotate90(),
        7 => img.rotate270().fliph(), // transverse
        8 => img.rotate270(),
        _ => img,
    }
}
