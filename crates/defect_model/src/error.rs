use thiserror::Error;

/// Errors reported by a defect model or one of its components.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Training needs at least one good image
    #[error("Training set has no good images")]
    EmptyTrainingSet,

    /// Component file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Component serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored component is inconsistent
    #[error("Invalid component: {0}")]
    InvalidComponent(String),
}
