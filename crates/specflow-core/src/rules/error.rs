//! Error types for rule loading.

/// Errors produced while loading a rule source.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("duplicate rule identifier: {id}")]
    DuplicateRule { id: String },

    #[error("rule identifier must not be empty (rule #{position})")]
    EmptyIdentifier { position: usize },

    #[error("unsupported rule source format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid JSON rule source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML rule source: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for rule loading.
pub type RuleResult<T> = std::result::Result<T, RuleError>;
