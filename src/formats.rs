// src/formats.rs
//
// Static format/capability table.
// Consulted, never mutated: entries are fixed at compile time and safely
// shared across any number of concurrent conversions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::Path;

bitflags! {
    /// Feature set of an output format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FormatCaps: u8 {
        /// The encoder can carry an alpha channel.
        const TRANSPARENCY = 1 << 0;
        /// The encoder accepts a 1-100 quality parameter.
        const QUALITY = 1 << 1;
    }
}

/// Encoder identities the pipeline can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Tiff,
    Bmp,
    Gif,
    Ico,
}

impl OutputFormat {
    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Ico => "ico",
        }
    }

    /// File extension written to the output path.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            other => other.as_str(),
        }
    }
}

/// Codec-specific compression hint, applied by the encoder dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionHint {
    /// Lossless internal optimization (PNG recompression pass, JPEG
    /// optimized entropy coding).
    Optimize,
    /// LZW compression (TIFF).
    Lzw,
    /// libwebp effort level 0-6.
    Method(u8),
    /// Whatever the encoder does by default.
    EncoderDefault,
}

/// One row of the capability table.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityEntry {
    pub format: OutputFormat,
    pub caps: FormatCaps,
    pub compression: CompressionHint,
}

impl CapabilityEntry {
    pub fn supports_transparency(&self) -> bool {
        self.caps.contains(FormatCaps::TRANSPARENCY)
    }

    pub fn supports_quality(&self) -> bool {
        self.caps.contains(FormatCaps::QUALITY)
    }
}

static CAPABILITIES: [CapabilityEntry; 7] = [
    CapabilityEntry {
        format: OutputFormat::Png,
        caps: FormatCaps::TRANSPARENCY,
        compression: CompressionHint::Optimize,
    },
    CapabilityEntry {
        format: OutputFormat::Jpeg,
        caps: FormatCaps::QUALITY,
        compression: CompressionHint::Optimize,
    },
    CapabilityEntry {
        format: OutputFormat::Webp,
        caps: FormatCaps::TRANSPARENCY.union(FormatCaps::QUALITY),
        compression: CompressionHint::Method(6),
    },
    CapabilityEntry {
        format: OutputFormat::Tiff,
        caps: FormatCaps::empty(),
        compression: CompressionHint::Lzw,
    },
    CapabilityEntry {
        format: OutputFormat::Bmp,
        caps: FormatCaps::empty(),
        compression: CompressionHint::EncoderDefault,
    },
    CapabilityEntry {
        format: OutputFormat::Gif,
        caps: FormatCaps::TRANSPARENCY,
        compression: CompressionHint::EncoderDefault,
    },
    CapabilityEntry {
        format: OutputFormat::Ico,
        caps: FormatCaps::TRANSPARENCY,
        compression: CompressionHint::EncoderDefault,
    },
];

/// Resolve a user-supplied format name to its capability entry.
/// Case-insensitive; `jpg` and `jpeg` resolve to the same entry.
pub fn lookup(name: &str) -> Option<&'static CapabilityEntry> {
    let name = name.trim().to_ascii_lowercase();
    let format = match name.as_str() {
        "png" => OutputFormat::Png,
        "jpg" | "jpeg" => OutputFormat::Jpeg,
        "webp" => OutputFormat::Webp,
        "tiff" => OutputFormat::Tiff,
        "bmp" => OutputFormat::Bmp,
        "gif" => OutputFormat::Gif,
        "ico" => OutputFormat::Ico,
        _ => return None,
    };
    CAPABILITIES.iter().find(|entry| entry.format == format)
}

/// Extensions accepted as conversion input.
///
/// `avif` is in the set even though no AVIF codec is wired in: such files
/// pass the extension gate and surface a per-file decode error instead of
/// being silently filtered out.
pub static SUPPORTED_INPUT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "avif", "ico", "ppm", "pgm", "pbm",
];

pub fn is_supported_input_extension(extension: &str) -> bool {
    let extension = extension.to_ascii_lowercase();
    SUPPORTED_INPUT_EXTENSIONS.contains(&extension.as_str())
}

/// Lower-cased extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
