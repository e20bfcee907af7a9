//! Error types for label file operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::ParseColorError;

/// Underlying causes of a label file failure.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded image data is not valid base64
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Image bytes could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Color value could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(#[from] ParseColorError),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Required field is missing
    #[error("Missing required field: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

/// Failure to load or save a label document.
#[derive(Error, Debug)]
pub enum LabelFileError {
    /// The document could not be read; the in-memory document is unchanged
    #[error("Failed to load label file {path:?}: {source}")]
    Load {
        /// File that was being loaded
        path: PathBuf,
        /// What went wrong
        #[source]
        source: FormatError,
    },

    /// The document could not be written; the recorded filename is unchanged
    #[error("Failed to save label file {path:?}: {source}")]
    Save {
        /// File that was being written
        path: PathBuf,
        /// What went wrong
        #[source]
        source: FormatError,
    },
}

impl LabelFileError {
    /// The underlying cause.
    pub fn cause(&self) -> &FormatError {
        match self {
            LabelFileError::Load { source, .. } | LabelFileError::Save { source, .. } => source,
        }
    }
}
