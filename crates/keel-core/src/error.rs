//! Error types for keel-core

use thiserror::Error;

/// Core error type for Keel configuration and schema files
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Config or schema file not found
    #[error("[C001] File not found: {path}")]
    FileNotFound { path: String },

    /// C002: Failed to parse a YAML file
    #[error("[C002] Failed to parse '{path}': {source}")]
    YamlParse {
        path: String,
        source: serde_yaml::Error,
    },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: IO error with file path context
    #[error("[C004] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C005: A change definition is malformed
    #[error("[C005] Change '{id}' in '{path}': {message}")]
    InvalidChange {
        path: String,
        id: String,
        message: String,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
