//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (size bound, timeout, extraction, ...)
//! - Classification into the [`FailureKind`] recorded on failed jobs
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::{FailureKind, JobId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// URL is not from a supported platform (rejected before a job is created)
    #[error("unsupported URL: {0}")]
    UnsupportedUrl(String),

    /// Job not found in the store
    #[error("job {0} not found")]
    JobNotFound(JobId),

    /// Artifact requested for a job that has not completed
    #[error("job {id} is not completed (current status: {status})")]
    NotCompleted {
        /// The job whose artifact was requested
        id: JobId,
        /// Its current status
        status: String,
    },

    /// Media size exceeds the configured maximum
    #[error("media size {size_bytes} bytes exceeds maximum allowed {limit_bytes} bytes")]
    SizeExceeded {
        /// Reported or measured size in bytes
        size_bytes: u64,
        /// Configured maximum in bytes
        limit_bytes: u64,
    },

    /// Wall-clock extraction budget exceeded
    #[error("extraction exceeded the {seconds}s time budget")]
    Timeout {
        /// The configured budget in seconds
        seconds: u64,
    },

    /// Underlying extractor failed; message passed through opaquely
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Extractor reported success but no output file was located
    #[error("no output file found for job {id} in {dir}")]
    ArtifactNotFound {
        /// The job whose artifact is missing
        id: JobId,
        /// The directory that was probed
        dir: PathBuf,
    },

    /// No usable extractor binary (not configured and not on PATH)
    #[error("extractor unavailable: {0}")]
    ExtractorUnavailable(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

impl Error {
    /// Classify this error into the kind recorded on a failed job record.
    ///
    /// Returns `None` for errors that never occur inside job execution
    /// (lookup failures, config errors, server plumbing).
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::SizeExceeded { .. } => Some(FailureKind::SizeExceeded),
            Error::Timeout { .. } => Some(FailureKind::Timeout),
            Error::Extraction(_) | Error::ExtractorUnavailable(_) => {
                Some(FailureKind::ExtractionFailed)
            }
            Error::ArtifactNotFound { .. } => Some(FailureKind::ArtifactNotFound),
            // I/O during extraction or artifact probing is an extraction failure
            // from the caller's point of view
            Error::Io(_) => Some(FailureKind::ExtractionFailed),
            _ => None,
        }
    }
}

/// API error response format
///
/// Returned by API endpoints when an error occurs, following a standard
/// format with machine-readable error codes and human-readable messages.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job 7c9e... not found",
///     "details": {
///       "job_id": "7c9e..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "unsupported_url")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 422 Unprocessable Entity - Semantic errors
            Error::UnsupportedUrl(_) => 422,

            // 404 Not Found
            Error::JobNotFound(_) => 404,
            Error::ArtifactNotFound { .. } => 404,

            // 409 Conflict - Resource not in the required state
            Error::NotCompleted { .. } => 409,

            // 413 Payload Too Large
            Error::SizeExceeded { .. } => 413,

            // 502/504 - External extraction failures
            Error::Extraction(_) => 502,
            Error::Timeout { .. } => 504,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExtractorUnavailable(_) => 503,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::UnsupportedUrl(_) => "unsupported_url",
            Error::JobNotFound(_) => "job_not_found",
            Error::NotCompleted { .. } => "not_completed",
            Error::SizeExceeded { .. } => "size_exceeded",
            Error::Timeout { .. } => "timeout",
            Error::Extraction(_) => "extraction_failed",
            Error::ArtifactNotFound { .. } => "artifact_not_found",
            Error::ExtractorUnavailable(_) => "extractor_unavailable",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::JobNotFound(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::NotCompleted { id, status } => Some(serde_json::json!({
                "job_id": id,
                "status": status,
            })),
            Error::SizeExceeded {
                size_bytes,
                limit_bytes,
            } => Some(serde_json::json!({
                "size_bytes": size_bytes,
                "limit_bytes": limit_bytes,
            })),
            Error::ArtifactNotFound { id, dir } => Some(serde_json::json!({
                "job_id": id,
                "dir": dir,
            })),
            Error::Timeout { seconds } => Some(serde_json::json!({
                "timeout_seconds": seconds,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
