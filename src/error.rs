use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors surfaced by checkpoint registration.
#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("score attribute '{path}' resolved to {found}, expected a number")]
    ScoreNotNumeric { path: String, found: &'static str },
}

/// Errors reported by a `CheckpointStore` collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("durable artifact not found at {0}")]
    Missing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
