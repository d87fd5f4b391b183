//! Error codes carried in every [`ErrorResponse`](super::ErrorResponse).
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::UpstreamTimeout;
//! assert_eq!(code.as_str(), "UPSTREAM_TIMEOUT");
//! assert_eq!(code.code(), 2002);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    ValidationError,
    InvalidQuery,
    InvalidUpload,
    JsonExtraction,
    NotFound,
    Conflict,

    // Upstream errors (2000-2999)
    UpstreamUnavailable,
    UpstreamTimeout,
    MalformedUpstreamResponse,

    // Server errors (9000-9999)
    InternalError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 10] = [
        ErrorCode::ValidationError,
        ErrorCode::InvalidQuery,
        ErrorCode::InvalidUpload,
        ErrorCode::JsonExtraction,
        ErrorCode::NotFound,
        ErrorCode::Conflict,
        ErrorCode::UpstreamUnavailable,
        ErrorCode::UpstreamTimeout,
        ErrorCode::MalformedUpstreamResponse,
        ErrorCode::InternalError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidQuery => "INVALID_QUERY",
            ErrorCode::InvalidUpload => "INVALID_UPLOAD",
            ErrorCode::JsonExtraction => "JSON_EXTRACTION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            ErrorCode::MalformedUpstreamResponse => "MALFORMED_UPSTREAM_RESPONSE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidQuery => 1003,
            ErrorCode::InvalidUpload => 1004,
            ErrorCode::JsonExtraction => 1005,
            ErrorCode::NotFound => 1006,
            ErrorCode::Conflict => 1007,
            ErrorCode::UpstreamUnavailable => 2001,
            ErrorCode::UpstreamTimeout => 2002,
            ErrorCode::MalformedUpstreamResponse => 2003,
            ErrorCode::InternalError => 9001,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Request validation failed",
            ErrorCode::InvalidQuery => "Invalid query parameters",
            ErrorCode::InvalidUpload => "Invalid multipart upload",
            ErrorCode::JsonExtraction => "Failed to parse JSON request body",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::Conflict => "Resource already exists",
            ErrorCode::UpstreamUnavailable => "An upstream service is unavailable",
            ErrorCode::UpstreamTimeout => "An upstream service timed out",
            ErrorCode::MalformedUpstreamResponse => "An upstream service returned a malformed response",
            ErrorCode::InternalError => "An internal server error occurred",
        }
    }

    /// Whether a client may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::UpstreamUnavailable | ErrorCode::UpstreamTimeout
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
