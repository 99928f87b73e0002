//! Error types for the CSV import pipeline
//!
//! This module defines the fatal errors that can stop an import.
//! Row-level problems (bad dates, bad amounts, unmatched regexes) are never
//! errors: they travel as data on each candidate and surface as issues.
//!
//! # Error Categories
//!
//! - **File I/O Errors**: File not found, permission denied, etc.
//! - **CSV Parsing Errors**: Malformed CSV structure
//! - **Mapping Errors**: Invalid regex patterns or column assignments
//! - **Remote Errors**: Failed calls to the finance API
//! - **Session Errors**: Import state machine misuse

use thiserror::Error;

/// Main error type for the import pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    /// File not found at the specified path
    ///
    /// This is a fatal error that prevents processing from starting.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV tokenizer error
    ///
    /// Raised only for structural problems the tokenizer cannot recover from.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// A parse rule carries a regex that does not compile
    #[error("Invalid regex '{pattern}' for field {field}: {message}")]
    InvalidRegex {
        /// Field the parse rule belongs to
        field: String,
        /// The offending pattern
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Mapping profile is unusable (unreadable JSON, bad separator, etc.)
    #[error("Invalid mapping: {message}")]
    InvalidMapping {
        /// Description of the problem
        message: String,
    },

    /// Remote API call failed
    #[error("API error during {operation}: {message}")]
    Api {
        /// Operation that failed
        operation: String,
        /// Description of the failure
        message: String,
    },

    /// Import session used out of order
    #[error("Import session is {actual}, expected {expected}")]
    InvalidState {
        /// State the operation requires
        expected: String,
        /// State the session was in
        actual: String,
    },

    /// Command-line settings are inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },

    /// Async runtime could not be created
    #[error("Runtime error: {message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for ImportError {
    fn from(error: std::io::Error) -> Self {
        ImportError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ImportError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for ImportError {
    fn from(error: csv_async::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ImportError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(error: serde_json::Error) -> Self {
        ImportError::InvalidMapping {
            message: error.to_string(),
        }
    }
}

impl ImportError {
    /// Create an InvalidRegex error
    pub fn invalid_regex(field: &str, pattern: &str, error: &regex::Error) -> Self {
        ImportError::InvalidRegex {
            field: field.to_string(),
            pattern: pattern.to_string(),
            message: error.to_string(),
        }
    }

    /// Create an InvalidMapping error
    pub fn invalid_mapping(message: impl Into<String>) -> Self {
        ImportError::InvalidMapping {
            message: message.into(),
        }
    }

    /// Create an Api error
    pub fn api(operation: &str, message: impl std::fmt::Display) -> Self {
        ImportError::Api {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ImportError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(expected: &str, actual: &str) -> Self {
        ImportError::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a FileNotFound error
    pub fn file_not_found(path: &std::path::Path) -> Self {
        ImportError::FileNotFound {
            path: path.display().to_string(),
        }
    }

    /// Map a file-open failure, keeping "not found" distinct from other I/O errors
    pub fn from_open(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::file_not_found(path)
        } else {
            ImportError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case::file_not_found(
        ImportError::FileNotFound { path: "bank.csv".to_string() },
        "File not found: bank.csv"
    )]
    #[case::io_error(
        ImportError::IoError { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::parse_error_with_line(
        ImportError::ParseError { line: Some(42), message: "unequal lengths".to_string() },
        "CSV parse error at line 42: unequal lengths"
    )]
    #[case::parse_error_without_line(
        ImportError::ParseError { line: None, message: "unequal lengths".to_string() },
        "CSV parse error: unequal lengths"
    )]
    #[case::invalid_regex(
        ImportError::InvalidRegex {
            field: "amount".to_string(),
            pattern: "(".to_string(),
            message: "unclosed group".to_string(),
        },
        "Invalid regex '(' for field amount: unclosed group"
    )]
    #[case::api(
        ImportError::Api { operation: "create_transactions".to_string(), message: "502".to_string() },
        "API error during create_transactions: 502"
    )]
    #[case::invalid_state(
        ImportError::InvalidState { expected: "waiting".to_string(), actual: "imported".to_string() },
        "Import session is imported, expected waiting"
    )]
    #[case::invalid_config(
        ImportError::invalid_config("import needs --api-url"),
        "Invalid configuration: import needs --api-url"
    )]
    fn test_error_display(#[case] error: ImportError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::invalid_mapping(
        ImportError::invalid_mapping("bad separator"),
        ImportError::InvalidMapping { message: "bad separator".to_string() }
    )]
    #[case::api(
        ImportError::api("find_accounts", "timeout"),
        ImportError::Api { operation: "find_accounts".to_string(), message: "timeout".to_string() }
    )]
    #[case::invalid_state(
        ImportError::invalid_state("waiting", "importing"),
        ImportError::InvalidState { expected: "waiting".to_string(), actual: "importing".to_string() }
    )]
    fn test_helper_functions(#[case] result: ImportError, #[case] expected: ImportError) {
        assert_eq!(result, expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ImportError = io_error.into();
        assert!(matches!(error, ImportError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_open_error_not_found_is_distinct() {
        let error = ImportError::from_open(
            Path::new("missing.csv"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(error, ImportError::file_not_found(Path::new("missing.csv")));
    }

    #[test]
    fn test_regex_error_conversion() {
        let err = regex::Regex::new("(").unwrap_err();
        let error = ImportError::invalid_regex("date", "(", &err);
        assert!(error.to_string().starts_with("Invalid regex '(' for field date"));
    }
}
