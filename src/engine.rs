// src/engine.rs
//
// The conversion engine: decode, normalize transparency, resize, orient,
// encode. This file is a facade over the decomposed modules in engine/.

// =============================================================================
// DECODE SAFETY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Larger inputs are rejected before decode to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

mod common;
mod decoder;
mod encoder;
mod io;
mod orient;
mod pipeline;
mod resize;
mod transparency;

pub use common::panic_message;
pub use decoder::{
    check_dimensions, decode_image, detect_exif_orientation, detect_format,
    ensure_dimensions_safe,
};
pub use encoder::{encode, DEFAULT_QUALITY};
pub use io::{extract_icc_profile, read_source, unique_output_path, write_output, SourceBytes};
pub use orient::normalize_orientation;
pub use pipeline::{
    convert, ConversionResult, ConversionSettings, Failure, ResizeTarget, MAX_TARGET_SIDE,
};
pub use resize::{calc_fit_dimensions, fast_resize};
pub use transparency::{flatten_to_white, has_alpha};
