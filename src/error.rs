//! Error types for the occupation search engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use crate::vector::{VectorError, VectorStorageError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing and search operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration errors (bad settings, unreachable model at startup)
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    /// Dataset reading errors
    #[error("Failed to read dataset '{path}': {source}")]
    DatasetRead {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Query issued against an index that has never been built or committed.
    /// Retryable: the caller may wait for an in-flight rebuild and retry.
    #[error("Index '{name}' is not available. Run 'ncofind index' to build it first.")]
    IndexUnavailable { name: String },

    /// Embedding model failures (load or encode)
    #[error("Embedding operation failed: {0}")]
    Embedding(String),

    /// Storage errors
    #[error("Failed to persist index data to '{path}': {source}")]
    PersistenceError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to load index data from '{path}': {source}")]
    LoadError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Vector subsystem errors (dimension mismatch, storage format, clustering)
    #[error("Vector operation failed: {0}")]
    Vector(#[from] VectorError),

    /// Raw I/O errors (lock files, directory creation)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// General errors for cases where we need to preserve existing behavior
    #[error("{0}")]
    General(String),
}

impl From<VectorStorageError> for EngineError {
    fn from(err: VectorStorageError) -> Self {
        match err {
            VectorStorageError::Io(e) => Self::Vector(VectorError::Storage(e)),
            VectorStorageError::InvalidFormat(msg) => {
                Self::Vector(VectorError::Serialization(msg))
            }
            VectorStorageError::Vector(e) => Self::Vector(e),
        }
    }
}

impl EngineError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::DatasetRead { .. } => "DATASET_READ_ERROR",
            Self::IndexUnavailable { .. } => "INDEX_UNAVAILABLE",
            Self::Embedding(_) => "EMBEDDING_ERROR",
            Self::PersistenceError { .. } => "PERSISTENCE_ERROR",
            Self::LoadError { .. } => "LOAD_ERROR",
            Self::Vector(_) => "VECTOR_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::General(_) => "GENERAL_ERROR",
        }
        .to_string()
    }

    /// Whether the caller may reasonably retry the operation later.
    ///
    /// Only `IndexUnavailable` qualifies: the index may be mid-rebuild and
    /// become queryable once the rebuild commits.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexUnavailable { .. })
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::IndexUnavailable { .. } => vec![
                "Run 'ncofind index --dataset <csv>' to build the index",
                "If a rebuild is in progress, wait for it to finish and retry",
            ],
            Self::DatasetRead { .. } => vec![
                "Check that the dataset file exists and you have read permissions",
                "Verify the CSV has the NCO2015_Code, Title, NCO2004_Code headers",
            ],
            Self::Embedding(_) => vec![
                "The embedding model downloads on first use; check network connectivity",
                "Verify the configured model name with 'ncofind config'",
            ],
            Self::Config { .. } => vec![
                "Run 'ncofind init' to create a default configuration",
                "Check ncofind.toml for syntax errors",
            ],
            Self::LoadError { .. } | Self::PersistenceError { .. } => vec![
                "Check disk space and permissions in the index directory",
                "Run 'ncofind index' to rebuild from scratch",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T, EngineError>;

    /// Add context with a path
    fn with_path(self, path: &std::path::Path) -> Result<T, EngineError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, EngineError> {
        self.map_err(|e| EngineError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, EngineError> {
        self.map_err(|e| {
            EngineError::General(format!("Error processing '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let err = EngineError::IndexUnavailable {
            name: "nco2015".to_string(),
        };
        assert_eq!(err.status_code(), "INDEX_UNAVAILABLE");
        assert!(err.is_retryable());

        let err = EngineError::General("oops".to_string());
        assert_eq!(err.status_code(), "GENERAL_ERROR");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_errors_have_suggestions() {
        let err = EngineError::IndexUnavailable {
            name: "nco2015".to_string(),
        };
        assert!(!err.recovery_suggestions().is_empty());
    }
}
