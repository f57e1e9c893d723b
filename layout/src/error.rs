//! Error types for file-based conversion workflows.
//!
//! The layout engine itself never fails; these cover reading copybooks,
//! writing schemas, configuration files and validation of stored schemas.

use thiserror::Error;

/// Errors from conversion, configuration and validation workflows.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Schema or package validation failure.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Invalid or missing input (e.g. empty input directory, wrong extension).
    #[error("{0}")]
    InvalidInput(String),

    /// The worker pool for batch conversion could not be started.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience alias for results with [`ConvertError`].
pub type Result<T> = std::result::Result<T, ConvertError>;
