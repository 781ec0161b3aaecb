//! Error types for the equalizer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while validating, decoding or equalizing an image.
///
/// The client-input kinds carry stable identities (see [`Error::code`]) that a
/// transport layer can map to its own status codes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid max_kernel {max_kernel}: must be odd and >= 3")]
    InvalidKernelSize { max_kernel: i64 },

    #[error("Gain count mismatch: declared {declared} control points, got {actual}")]
    GainCountMismatch { declared: usize, actual: usize },

    #[error("Unsupported media type '{media_type}'")]
    UnsupportedMediaType { media_type: String },

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Failed to decode image: {reason}")]
    DecodeFailure { reason: String },

    #[error("No operation selected: enable equalization and/or modulation")]
    NoOperationSelected,

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("Failed to encode image: {reason}")]
    EncodeFailure { reason: String },

    #[error("Invalid configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Processing error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable snake-case identity of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidKernelSize { .. } => "invalid_kernel_size",
            Error::GainCountMismatch { .. } => "gain_count_mismatch",
            Error::UnsupportedMediaType { .. } => "unsupported_media_type",
            Error::EmptyPayload => "empty_payload",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::DecodeFailure { .. } => "decode_failure",
            Error::NoOperationSelected => "no_operation_selected",
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::InvalidImage { .. } => "invalid_image",
            Error::EncodeFailure { .. } | Error::Config { .. } | Error::Internal(_) => {
                "processing_error"
            }
        }
    }

    /// True when the caller can fix the failure by changing its input.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::EncodeFailure { .. } | Error::Config { .. } | Error::Internal(_)
        )
    }
}
