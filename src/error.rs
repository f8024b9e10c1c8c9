// src/error.rs
//
// Unified error handling for pixport.
// Uses thiserror; every variant maps onto one per-file failure kind via
// kind(), which is what batch reports carry.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Per-file failure kinds surfaced to callers and batch reports.
///
/// The first six match the pipeline's hard gates one-to-one; `InvalidSettings`
/// covers rejected settings records (out-of-range resize targets), and
/// `Internal` covers codec panics caught by the panic guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputNotFound,
    UnsupportedInputFormat,
    UnsupportedOutputFormat,
    Decode,
    Encode,
    Io,
    InvalidSettings,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputNotFound => "input_not_found",
            ErrorKind::UnsupportedInputFormat => "unsupported_input_format",
            ErrorKind::UnsupportedOutputFormat => "unsupported_output_format",
            ErrorKind::Decode => "decode",
            ErrorKind::Encode => "encode",
            ErrorKind::Io => "io",
            ErrorKind::InvalidSettings => "invalid_settings",
            ErrorKind::Internal => "internal",
        }
    }
}

/// pixport error types.
///
/// Variants carry enough structure to produce actionable messages without
/// string-parsing; paths are stored as display strings.
#[derive(Debug, Error)]
pub enum ConvertError {
    // Validation errors
    #[error("input file not found: {path}")]
    InputNotFound { path: Cow<'static, str> },

    #[error("unsupported input format: .{extension}")]
    UnsupportedInput { extension: Cow<'static, str> },

    #[error("unsupported output format: {name}")]
    UnsupportedOutput { name: Cow<'static, str> },

    #[error("invalid resize target {width}x{height}: each side must be in 1..=65535")]
    InvalidResizeTarget { width: u32, height: u32 },

    // File I/O errors
    #[error("failed to read '{path}': {source}")]
    FileRead {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    FileWrite {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Decode errors
    #[error("failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    // Processing/encode errors
    #[error("resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Caught codec panics
    #[error("internal error in {stage}: {message}")]
    Internal {
        stage: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

// Constructor helpers
impl ConvertError {
    pub fn input_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn unsupported_input(extension: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedInput {
            extension: extension.into(),
        }
    }

    pub fn unsupported_output(name: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedOutput { name: name.into() }
    }

    pub fn invalid_resize_target(width: u32, height: u32) -> Self {
        Self::InvalidResizeTarget { width, height }
    }

    pub fn file_read(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    pub fn file_write(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    pub fn create_dir(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn internal(
        stage: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Internal {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a per-file failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. } => ErrorKind::InputNotFound,
            Self::UnsupportedInput { .. } => ErrorKind::UnsupportedInputFormat,
            Self::UnsupportedOutput { .. } => ErrorKind::UnsupportedOutputFormat,
            Self::InvalidResizeTarget { .. } => ErrorKind::InvalidSettings,

            // Source reads and directory creation are generic filesystem
            // failures; a failed destination write surfaces as an encode
            // failure.
            Self::FileRead { .. } | Self::CreateDir { .. } => ErrorKind::Io,
            Self::FileWrite { .. } => ErrorKind::Encode,

            Self::DecodeFailed { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. } => ErrorKind::Decode,

            Self::ResizeFailed { .. } | Self::EncodeFailed { .. } => ErrorKind::Encode,

            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True when the user can fix the failure by changing inputs or settings.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, ConvertError>;
