use common::{DateRange, ErrorKind, InvalidDateRange, RoomId};
use thiserror::Error;

/// Errors that can occur in the room inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The requested period is empty or inverted.
    #[error("Invalid period: {0}")]
    InvalidRange(#[from] InvalidDateRange),

    /// The room does not exist.
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    /// The room is taken out of service.
    #[error("Room {0} is not operational")]
    RoomNotOperational(RoomId),

    /// Another lock already covers part of the requested period.
    #[error("Room {room_id} is not available for {range}")]
    RoomUnavailable { room_id: RoomId, range: DateRange },

    /// A lock with the same booking id or request id already exists.
    #[error("Duplicate room lock: {constraint}")]
    DuplicateLock { constraint: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl InventoryError {
    /// Caller-visible classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::InvalidRange(_) => ErrorKind::BadRequest,
            InventoryError::RoomNotFound(_) => ErrorKind::NotFound,
            InventoryError::RoomNotOperational(_)
            | InventoryError::RoomUnavailable { .. }
            | InventoryError::DuplicateLock { .. } => ErrorKind::Conflict,
            InventoryError::Database(_) | InventoryError::Migration(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for the error payload.
    pub fn public_message(&self) -> String {
        match self {
            InventoryError::RoomNotOperational(_) => "Room is not operational".to_string(),
            InventoryError::RoomUnavailable { .. } => {
                "Room is not available for this period".to_string()
            }
            InventoryError::Database(_) | InventoryError::Migration(_) => {
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
