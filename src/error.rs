//! Error types for the annotation core.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while loading, annotating and exporting images.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// Image failed to decode or has zero area
    #[error("Invalid image {path:?}: {reason}")]
    InvalidImage {
        /// Offending file
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Polygon cannot be closed yet
    #[error("Need at least 2 points to finish annotation (have {count})")]
    InsufficientPoints {
        /// Number of vertices currently captured
        count: usize,
    },

    /// File system failure tied to a specific path
    #[error("I/O error on {path:?}: {source}")]
    IoFailure {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Directory scan produced no candidates
    #[error("No images found in {dir:?}")]
    NoImagesFound {
        /// Scanned directory
        dir: PathBuf,
    },

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Error reported by the defect model service
    #[error("Model error: {0}")]
    Model(#[from] defect_model::ModelError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AnnotatorError {
    /// Create an invalid image error.
    pub fn invalid_image(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O failure bound to a path.
    pub fn io_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, AnnotatorError>;
