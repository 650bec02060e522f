//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - operation completed, results found (or no results is acceptable)
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - critical failure that should halt automation
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::EngineError;

/// Standard exit codes for CLI operations.
///
/// These codes follow Unix conventions where 0 indicates success,
/// and non-zero values indicate various error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Critical error that should halt automation (code 2)
    BlockingError = 2,

    /// Index not built yet; the command itself executed correctly (code 3)
    IndexUnavailable = 3,

    /// Failed to read or parse the source dataset (code 4)
    DatasetError = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Embedding model failed to load or encode (code 7)
    EmbeddingError = 7,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Convert an `EngineError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that scripts
    /// can use to determine appropriate recovery actions.
    pub fn from_error(error: &EngineError) -> Self {
        match error {
            // Recoverable: build the index and retry
            EngineError::IndexUnavailable { .. } => ExitCode::IndexUnavailable,

            EngineError::DatasetRead { .. } => ExitCode::DatasetError,

            EngineError::Config { .. } => ExitCode::ConfigError,

            EngineError::Embedding(_) => ExitCode::EmbeddingError,

            EngineError::Io(_)
            | EngineError::PersistenceError { .. }
            | EngineError::LoadError { .. } => ExitCode::IoError,

            // Corrupt index data should halt automation
            EngineError::Vector(_) => ExitCode::BlockingError,

            EngineError::General(_) => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates a blocking error.
    ///
    /// Blocking errors should halt automation pipelines.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - automation should halt",
            ExitCode::IndexUnavailable => "Index not available",
            ExitCode::DatasetError => "Dataset error",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::EmbeddingError => "Embedding model error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::GeneralError as u8, 1);
        assert_eq!(ExitCode::BlockingError as u8, 2);
        assert_eq!(ExitCode::IndexUnavailable as u8, 3);
    }

    #[test]
    fn test_from_error_mapping() {
        let err = EngineError::IndexUnavailable {
            name: "nco2015".to_string(),
        };
        assert_eq!(ExitCode::from_error(&err), ExitCode::IndexUnavailable);

        let err = EngineError::Embedding("model load failed".to_string());
        assert_eq!(ExitCode::from_error(&err), ExitCode::EmbeddingError);

        let err = EngineError::Config {
            reason: "bad toml".to_string(),
        };
        assert_eq!(ExitCode::from_error(&err), ExitCode::ConfigError);
    }

    #[test]
    fn test_is_success() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::IndexUnavailable.is_success());
        assert!(!ExitCode::GeneralError.is_success());
    }

    #[test]
    fn test_is_blocking() {
        assert!(ExitCode::BlockingError.is_blocking());
        assert!(!ExitCode::Success.is_blocking());
        assert!(!ExitCode::IndexUnavailable.is_blocking());
    }
}
