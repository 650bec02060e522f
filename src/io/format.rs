//! Format definitions for CLI input/output.
//!
//! Provides structured format types for consistent JSON responses
//! compatible with tool integration.

use crate::error::EngineError;
use crate::io::exit_code::ExitCode;
use serde::{Deserialize, Serialize};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// JSON for tool integration
    Json,
}

impl OutputFormat {
    /// Create format from JSON flag.
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    /// Check if format is JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Standard JSON envelope for error reporting.
///
/// Query responses are emitted bare (the `QueryResponse` shape); this
/// envelope wraps failures so scripts can branch on `code` and
/// `exit_code` without parsing message text.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonErrorResponse {
    /// Always "error"
    pub status: String,

    /// Stable result code (e.g., "INDEX_UNAVAILABLE")
    pub code: String,

    /// Human-readable message
    pub message: String,

    /// Recovery suggestions
    pub suggestions: Vec<String>,

    /// Exit code for shell scripts
    pub exit_code: u8,
}

impl JsonErrorResponse {
    /// Create an error response from an `EngineError`.
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            status: "error".to_string(),
            code: error.status_code(),
            message: error.to_string(),
            suggestions: error
                .recovery_suggestions()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exit_code: ExitCode::from_error(error) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
    }

    #[test]
    fn test_error_response_from_engine_error() {
        let err = EngineError::IndexUnavailable {
            name: "nco2015".to_string(),
        };
        let response = JsonErrorResponse::from_error(&err);

        assert_eq!(response.status, "error");
        assert_eq!(response.code, "INDEX_UNAVAILABLE");
        assert_eq!(response.exit_code, 3);
        assert!(!response.suggestions.is_empty());
    }
}
