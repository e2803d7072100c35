//! Error types for specification loading.

/// Errors produced while loading or addressing a specification.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("unsupported specification format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid JSON specification: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML specification: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for specification operations.
pub type SpecResult<T> = std::result::Result<T, SpecError>;
