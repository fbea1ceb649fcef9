//! Error types and exit codes for zotsort
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage or configuration error (bad flags, invalid config values)
//! - 3: Remote/data error (API failure, unexpected response shape)

mod macros;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the zotsort binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage or configuration error (2)
    Usage = 2,
    /// Remote/data error (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during zotsort operations
#[derive(Error, Debug)]
pub enum ZotsortError {
    // Usage/configuration errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Remote/data errors (exit code 3)
    #[error("{service} request failed with status {status}: {body}")]
    RemoteStatus {
        service: String,
        status: u16,
        body: String,
        /// Server-requested wait before retrying, in seconds
        retry_after: Option<u64>,
    },

    #[error("{service} transport error: {reason}")]
    RemoteTransport { service: String, reason: String },

    #[error("unexpected {service} response: {reason}")]
    RemoteResponse { service: String, reason: String },

    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    #[error("invalid input file {path:?}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl ZotsortError {
    /// Create an error for a non-success HTTP status
    pub fn remote_status(service: &str, status: u16, body: impl Into<String>) -> Self {
        ZotsortError::RemoteStatus {
            service: service.to_string(),
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Attach a server-requested retry delay to a status error
    pub fn with_retry_after(mut self, seconds: Option<u64>) -> Self {
        if let ZotsortError::RemoteStatus { retry_after, .. } = &mut self {
            *retry_after = seconds;
        }
        self
    }

    /// Server-requested retry delay, if the error carries one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ZotsortError::RemoteStatus {
                retry_after: Some(seconds),
                ..
            } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    /// Create an error for a connection-level failure
    pub fn remote_transport(service: &str, reason: impl std::fmt::Display) -> Self {
        ZotsortError::RemoteTransport {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for a response that could not be interpreted
    pub fn remote_response(service: &str, reason: impl std::fmt::Display) -> Self {
        ZotsortError::RemoteResponse {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        ZotsortError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        ZotsortError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        ZotsortError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Rate limiting (429), server errors (5xx) and transport failures are
    /// transient; everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ZotsortError::RemoteStatus { status, .. } => *status == 429 || *status >= 500,
            ZotsortError::RemoteTransport { .. } => true,
            _ => false,
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ZotsortError::UnknownFormat(_)
            | ZotsortError::UsageError(_)
            | ZotsortError::MissingConfig(_)
            | ZotsortError::InvalidValue { .. }
            | ZotsortError::Toml(_) => ExitCode::Usage,

            ZotsortError::RemoteStatus { .. }
            | ZotsortError::RemoteTransport { .. }
            | ZotsortError::RemoteResponse { .. }
            | ZotsortError::NotFound { .. }
            | ZotsortError::InvalidInput { .. } => ExitCode::Data,

            ZotsortError::Io(_)
            | ZotsortError::Json(_)
            | ZotsortError::FailedOperationWithTarget { .. }
            | ZotsortError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            ZotsortError::UnknownFormat(_) => "unknown_format",
            ZotsortError::UsageError(_) => "usage_error",
            ZotsortError::MissingConfig(_) => "missing_config",
            ZotsortError::InvalidValue { .. } => "invalid_value",
            ZotsortError::RemoteStatus { .. } => "remote_status",
            ZotsortError::RemoteTransport { .. } => "remote_transport",
            ZotsortError::RemoteResponse { .. } => "remote_response",
            ZotsortError::NotFound { .. } => "not_found",
            ZotsortError::InvalidInput { .. } => "invalid_input",
            ZotsortError::Io(_) => "io_error",
            ZotsortError::Json(_) => "json_error",
            ZotsortError::Toml(_) => "toml_error",
            ZotsortError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            ZotsortError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for zotsort operations
pub type Result<T> = std::result::Result<T, ZotsortError>;
