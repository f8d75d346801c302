//! Error types for prism

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrismError {
    // Ingestion errors
    #[error("Malformed geometry at feature {index}: {reason}")]
    MalformedGeometry { index: usize, reason: String },

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Spatial index errors
    #[error("Spatial index error: {0}")]
    Index(String),

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, PrismError>;
