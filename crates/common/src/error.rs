//! Error taxonomy shared by both services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of every failure a caller can observe.
///
/// Each kind has exactly one HTTP status. `BadRequest`, `Unauthorized`,
/// `NotFound` and `Conflict` are final; only transport-level failures are
/// ever retried, and they surface as `ServiceUnavailable` once exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    ServiceUnavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable `errorCode` value used in error payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// JSON error payload returned by both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub http_status: u16,
    pub error_code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl ErrorBody {
    /// Builds a payload for `kind`; path and correlation id are attached later.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_code(kind.status_code(), kind.code(), message)
    }

    /// Builds a payload with an explicit code, for errors outside [`ErrorKind`].
    pub fn with_code(http_status: u16, error_code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            http_status,
            error_code: error_code.to_string(),
            message: (!message.is_empty()).then_some(message),
            path: None,
            correlation_id: None,
        }
    }
}
