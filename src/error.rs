//! Error types for Transmeet.

use thiserror::Error;

/// Library-level error type for Transmeet operations.
#[derive(Error, Debug)]
pub enum TransmeetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    Credential(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Vector store transport error: {0}")]
    Transport(String),

    #[error("Routing failed: {0}")]
    Routing(String),

    #[error("Generation provider error: {0}")]
    Provider(String),

    #[error("Unknown record provenance: {0}")]
    UnknownProvenance(String),

    #[error("Event output failed: {0}")]
    Emit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Transmeet operations.
pub type Result<T> = std::result::Result<T, TransmeetError>;
