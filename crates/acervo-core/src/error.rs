//! Error types module
//!
//! Every failure in the catalog core is an `AppError`. Variants are grouped into the four
//! families the UI distinguishes (validation, transport, server, batch) plus integrity
//! violations and internal errors. Presentation details (machine code, client message,
//! log level) come from the `ErrorMetadata` trait so callers never match on variants just
//! to render a message.

use std::io;
use std::time::Duration;

/// Result alias used throughout the acervo crates
pub type AppResult<T> = Result<T, AppError>;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like network errors
    Warn,
    /// Error level - for unexpected failures and broken invariants
    Error,
}

/// Error family, mirroring what the user is told went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected on the client before any network call
    Validation,
    /// Network failure or deadline expiry
    Transport,
    /// The server answered with an error status
    Server,
    /// Aggregate of per-item outcomes
    Batch,
    /// A data-integrity rule was violated
    Integrity,
    /// Anything else
    Internal,
}

/// Metadata for error reporting - defines how an error should be presented
pub trait ErrorMetadata {
    /// Error family
    fn kind(&self) -> ErrorKind;

    /// Machine-readable error code (e.g., "TOO_LARGE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Human-readable message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File too large: {size} bytes exceeds the limit of {} MB", .limit / 1024 / 1024)]
    TooLarge { size: u64, limit: u64 },

    #[error("Unsupported type '{content_type}'. Allowed types: {allowed}")]
    UnsupportedType {
        content_type: String,
        allowed: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Batch partially failed: {succeeded} succeeded, {failed} failed")]
    PartialBatchFailure { succeeded: usize, failed: usize },

    #[error("Version cycle: {0}")]
    VersionCycle(String),

    #[error("Version chain corrupt: {0}")]
    VersionChainCorrupt(String),

    #[error("Invalid upload transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: uuid::Uuid,
        from: &'static str,
        to: &'static str,
    },

    #[error("Unknown category code: {0}")]
    UnknownCategoryCode(String),

    #[error("Unknown taxonomy node: {0}")]
    UnknownTaxonomyNode(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (kind, error_code, recoverable, suggested_action, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (ErrorKind, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::TooLarge { .. } => (
            ErrorKind::Validation,
            "TOO_LARGE",
            false,
            Some("Compress the file or split it before uploading"),
            LogLevel::Debug,
        ),
        AppError::UnsupportedType { .. } => (
            ErrorKind::Validation,
            "UNSUPPORTED_TYPE",
            false,
            Some("Convert the file to one of the allowed formats"),
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            ErrorKind::Validation,
            "INVALID_INPUT",
            false,
            Some("Check the values and try again"),
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            ErrorKind::Server,
            "NOT_FOUND",
            false,
            Some("Refresh the list; the document may have been removed"),
            LogLevel::Debug,
        ),
        AppError::Transport(_) => (
            ErrorKind::Transport,
            "TRANSPORT_ERROR",
            true,
            Some("Check the connection and retry"),
            LogLevel::Warn,
        ),
        AppError::Timeout { .. } => (
            ErrorKind::Transport,
            "TIMEOUT",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        AppError::Server { .. } => (
            ErrorKind::Server,
            "SERVER_ERROR",
            true,
            Some("Retry later or contact support if this persists"),
            LogLevel::Warn,
        ),
        AppError::PartialBatchFailure { .. } => (
            ErrorKind::Batch,
            "PARTIAL_BATCH_FAILURE",
            true,
            Some("Review the failed items and retry them"),
            LogLevel::Warn,
        ),
        AppError::VersionCycle(_) => (
            ErrorKind::Integrity,
            "VERSION_CYCLE",
            false,
            Some("Choose a different document to replace"),
            LogLevel::Error,
        ),
        AppError::VersionChainCorrupt(_) => (
            ErrorKind::Integrity,
            "VERSION_CHAIN_CORRUPT",
            false,
            Some("Contact support"),
            LogLevel::Error,
        ),
        AppError::InvalidTransition { .. } => (
            ErrorKind::Integrity,
            "INVALID_TRANSITION",
            false,
            None,
            LogLevel::Error,
        ),
        AppError::UnknownCategoryCode(_) => (
            ErrorKind::Integrity,
            "UNKNOWN_CATEGORY_CODE",
            false,
            Some("Update the application; the server sent an unknown document type"),
            LogLevel::Warn,
        ),
        AppError::UnknownTaxonomyNode(_) => (
            ErrorKind::Validation,
            "UNKNOWN_TAXONOMY_NODE",
            false,
            Some("Pick a category and subcategory from the list"),
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            ErrorKind::Internal,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error output
    pub fn error_type(&self) -> &str {
        match self {
            AppError::TooLarge { .. } => "TooLarge",
            AppError::UnsupportedType { .. } => "UnsupportedType",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Transport(_) => "Transport",
            AppError::Timeout { .. } => "Timeout",
            AppError::Server { .. } => "Server",
            AppError::PartialBatchFailure { .. } => "PartialBatchFailure",
            AppError::VersionCycle(_) => "VersionCycle",
            AppError::VersionChainCorrupt(_) => "VersionChainCorrupt",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::UnknownCategoryCode(_) => "UnknownCategoryCode",
            AppError::UnknownTaxonomyNode(_) => "UnknownTaxonomyNode",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Build a server error from an HTTP status, mapping 404 to `NotFound`.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 404 {
            AppError::NotFound(message)
        } else {
            AppError::Server { status, message }
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn kind(&self) -> ErrorKind {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::TooLarge { limit, .. } => format!(
                "File is too large. Maximum allowed size is {} MB",
                limit / 1024 / 1024
            ),
            AppError::UnsupportedType {
                content_type,
                allowed,
            } => format!(
                "Unsupported file type '{}'. Allowed types: {}",
                content_type, allowed
            ),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Transport(_) | AppError::Timeout { .. } => {
                "Network error while contacting the server".to_string()
            }
            AppError::Server { message, .. } => format!("Server error: {}", message),
            AppError::PartialBatchFailure { succeeded, failed } => format!(
                "{} of {} succeeded, {} failed",
                succeeded,
                succeeded + failed,
                failed
            ),
            AppError::VersionCycle(_) => "This replacement would create a version cycle".to_string(),
            AppError::VersionChainCorrupt(_) => "The version history is inconsistent".to_string(),
            AppError::InvalidTransition { .. } => "Upload state error".to_string(),
            AppError::UnknownCategoryCode(code) => format!("Unknown document type '{}'", code),
            AppError::UnknownTaxonomyNode(node) => format!("Unknown category '{}'", node),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_too_large() {
        let err = AppError::TooLarge {
            size: 30 * 1024 * 1024,
            limit: 25 * 1024 * 1024,
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.error_code(), "TOO_LARGE");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("25 MB"));
        assert!(err.to_string().contains("25 MB"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_timeout_is_transport() {
        let err = AppError::Timeout {
            operation: "upload".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.is_recoverable());
        assert_eq!(
            err.client_message(),
            "Network error while contacting the server"
        );
        assert_eq!(err.to_string(), "upload timed out after 30s");
    }

    #[test]
    fn test_error_metadata_partial_batch() {
        let err = AppError::PartialBatchFailure {
            succeeded: 4,
            failed: 1,
        };
        assert_eq!(err.kind(), ErrorKind::Batch);
        assert_eq!(err.client_message(), "4 of 5 succeeded, 1 failed");
    }

    #[test]
    fn test_from_status_maps_not_found() {
        assert!(matches!(
            AppError::from_status(404, "gone"),
            AppError::NotFound(_)
        ));
        let err = AppError::from_status(422, "bad title");
        assert!(matches!(err, AppError::Server { status: 422, .. }));
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn test_detailed_message_includes_source() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("writing archive"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("Caused by"));
    }
}
