//! CLI input/output: exit codes and output formatting.

pub mod exit_code;
pub mod format;

pub use exit_code::ExitCode;
pub use format::{JsonErrorResponse, OutputFormat};
