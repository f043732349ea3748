//! API error type with the JSON error envelope.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking::BookingError;
use common::{ErrorBody, ErrorKind};
use inventory::InventoryError;

/// `errorCode` for requests that could not be decoded.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// API-level error that renders as an [`ErrorBody`].
///
/// The body is also stored in the response extensions so the request-id
/// middleware can attach `path` and `correlationId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: u16,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status_code(),
            code: kind.code(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Undecodable body, query or path.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            code: VALIDATION_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(code = self.code, error = %self.message, "request failed");
        }

        let body = ErrorBody::with_code(self.status, self.code, self.message);
        let mut response = (status, Json(body.clone())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        if err.kind() == ErrorKind::Internal {
            tracing::error!(error = %err, "booking storage failure");
        }
        ApiError::new(err.kind(), err.public_message())
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        if err.kind() == ErrorKind::Internal {
            tracing::error!(error = %err, "inventory storage failure");
        }
        ApiError::new(err.kind(), err.public_message())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}
