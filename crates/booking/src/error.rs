//! Booking error types.

use common::{BookingId, ErrorKind, InvalidDateRange, RequestId};
use thiserror::Error;

use crate::client::ClientError;
use crate::model::BookingStatus;

/// Errors that can occur in the booking ledger and saga.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Invalid input; nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The request id was already claimed by an earlier request.
    #[error("Duplicate request: X-Request-Id={0}")]
    DuplicateRequest(RequestId),

    /// Auto-select found no free room for the period.
    #[error("No available rooms for this period")]
    NoRoomsAvailable,

    /// The booking does not exist or belongs to another user.
    #[error("Booking {0} not found")]
    NotFound(BookingId),

    /// A status update lost a compare-and-set race.
    #[error("Booking {id} is no longer {expected}")]
    StaleStatus { id: BookingId, expected: BookingStatus },

    /// The remote inventory call failed.
    #[error(transparent)]
    Inventory(#[from] ClientError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<InvalidDateRange> for BookingError {
    fn from(_: InvalidDateRange) -> Self {
        BookingError::Validation("Invalid dates: startDate must be before endDate".to_string())
    }
}

impl BookingError {
    /// Caller-visible classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation(_) => ErrorKind::BadRequest,
            BookingError::DuplicateRequest(_)
            | BookingError::NoRoomsAvailable
            | BookingError::StaleStatus { .. } => ErrorKind::Conflict,
            BookingError::NotFound(_) => ErrorKind::NotFound,
            BookingError::Inventory(err) => err.kind(),
            BookingError::Database(_) | BookingError::Migration(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for the error payload.
    pub fn public_message(&self) -> String {
        match self {
            BookingError::Database(_) | BookingError::Migration(_) => {
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
