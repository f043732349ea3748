use async_trait::async_trait;
use common::{BookingId, RequestId, UserId};

use crate::{Booking, BookingStatus, NewBooking, Page, PageRequest, Result};

/// Persistence port for the booking ledger.
///
/// Each method is one atomic unit. In particular a PENDING booking and its
/// later status change are separate writes, so the PENDING row survives a
/// crash in between.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Records a request id as accepted.
    ///
    /// Fails with `BookingError::DuplicateRequest` if it was already
    /// recorded; nothing is written in that case.
    async fn insert_request(&self, request_id: &RequestId) -> Result<()>;

    /// Inserts a booking with status PENDING.
    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking>;

    /// Moves a booking from `from` to `to`.
    ///
    /// Returns `Ok(None)` if the booking is missing or no longer in `from`.
    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>>;

    /// Loads a booking by id.
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Returns a user's bookings, newest first.
    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>>;
}
