//! Remote inventory client.
//!
//! The saga only talks to the room inventory through [`InventoryClient`].
//! [`HttpInventoryClient`] is the network adapter with the bounded retry
//! envelope; [`LocalInventoryClient`] calls a [`inventory::RoomLockManager`]
//! in-process and records calls for tests and single-binary runs.

pub mod http;
pub mod local;
pub mod retry;

use async_trait::async_trait;
use common::{BookingUid, ConfirmAvailabilityRequest, DateRange, ErrorKind, RequestId, RoomId, RoomView};
use thiserror::Error;

pub use http::{HttpInventoryClient, HttpInventoryClientConfig};
pub use local::{InventoryCalls, LocalInventoryClient};
pub use retry::RetryPolicy;

/// Operation names as reported in logs, metrics and exhaustion errors.
pub const OP_RECOMMEND: &str = "recommend";
pub const OP_CONFIRM: &str = "confirm-availability";
pub const OP_RELEASE: &str = "release";

/// Failure of a remote inventory call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// 400 from the inventory.
    #[error("{}", .0.as_deref().unwrap_or("Bad request to inventory service"))]
    BadRequest(Option<String>),

    /// 401 or 403: the service credential was rejected.
    #[error("Inventory service rejected service token")]
    Unauthorized,

    /// 404 from the inventory.
    #[error("Inventory service resource not found")]
    NotFound,

    /// 409: room not available, room out of service, or similar.
    #[error("{}", .0.as_deref().unwrap_or("Inventory service conflict"))]
    Conflict(Option<String>),

    /// Connection, timeout or decoding failure of a single attempt.
    #[error("Inventory service transport failure: {0}")]
    Transport(String),

    /// Any other status of a single attempt.
    #[error("Inventory service responded with status {status}")]
    UnexpectedStatus { status: u16, message: Option<String> },

    /// Every attempt failed with a retryable error.
    #[error("Inventory service is unavailable during '{operation}' after {attempts} attempt(s)")]
    Unavailable {
        operation: &'static str,
        attempts: u32,
    },
}

impl ClientError {
    /// Maps a non-success HTTP status and its parsed message.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400 => ClientError::BadRequest(message),
            401 | 403 => ClientError::Unauthorized,
            404 => ClientError::NotFound,
            409 => ClientError::Conflict(message),
            _ => ClientError::UnexpectedStatus { status, message },
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::UnexpectedStatus { .. }
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::BadRequest(_) => ErrorKind::BadRequest,
            ClientError::Unauthorized => ErrorKind::Unauthorized,
            ClientError::NotFound => ErrorKind::NotFound,
            ClientError::Conflict(_) => ErrorKind::Conflict,
            ClientError::Transport(_)
            | ClientError::UnexpectedStatus { .. }
            | ClientError::Unavailable { .. } => ErrorKind::ServiceUnavailable,
        }
    }
}

/// Request/response contract with the room inventory.
///
/// Every call carries the end-to-end request id so that the inventory's
/// idempotency lines up with the booking side's.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Free rooms for the period, least booked first.
    async fn recommend(
        &self,
        range: DateRange,
        request_id: &RequestId,
    ) -> Result<Vec<RoomView>, ClientError>;

    /// Locks `room_id` for the booking described by `request`.
    async fn confirm(
        &self,
        room_id: RoomId,
        request: &ConfirmAvailabilityRequest,
    ) -> Result<(), ClientError>;

    /// Drops the lock held for `booking_uid`, if any.
    async fn release(
        &self,
        room_id: RoomId,
        booking_uid: BookingUid,
        request_id: &RequestId,
    ) -> Result<(), ClientError>;
}

#[async_trait]
impl<C: InventoryClient + ?Sized> InventoryClient for std::sync::Arc<C> {
    async fn recommend(
        &self,
        range: DateRange,
        request_id: &RequestId,
    ) -> Result<Vec<RoomView>, ClientError> {
        (**self).recommend(range, request_id).await
    }

    async fn confirm(
        &self,
        room_id: RoomId,
        request: &ConfirmAvailabilityRequest,
    ) -> Result<(), ClientError> {
        (**self).confirm(room_id, request).await
    }

    async fn release(
        &self,
        room_id: RoomId,
        booking_uid: BookingUid,
        request_id: &RequestId,
    ) -> Result<(), ClientError> {
        (**self).release(room_id, booking_uid, request_id).await
    }
}
