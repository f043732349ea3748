//! Booking saga: reserve locally, confirm remotely, compensate on failure.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use common::{
    BookingId, BookingUid, ConfirmAvailabilityRequest, DateRange, RequestId, RoomId, UserId,
};

use crate::client::InventoryClient;
use crate::idempotency::IdempotencyGuard;
use crate::store::BookingStore;
use crate::{
    Booking, BookingError, BookingStatus, BookingView, CreateBooking, NewBooking, Page,
    PageRequest, Result,
};

/// Orchestrates booking creation and cancellation against the remote
/// inventory.
///
/// ```text
/// create: validate ─► claim request id ─► resolve room ─► PENDING
///             ─► confirm ──┬─ ok ───► CONFIRMED
///                          └─ error ─► CANCELLED + release (best effort)
/// ```
///
/// The PENDING row is committed before the remote call and the final status
/// is a separate write, so a booking interrupted by a crash stays visible as
/// PENDING. Once `create` returns, the booking is never left PENDING.
pub struct BookingSaga<S: BookingStore, C: InventoryClient> {
    store: Arc<S>,
    guard: IdempotencyGuard<S>,
    inventory: C,
}

impl<S: BookingStore, C: InventoryClient> BookingSaga<S, C> {
    /// Creates a new booking saga.
    pub fn new(store: Arc<S>, inventory: C) -> Self {
        Self {
            guard: IdempotencyGuard::new(store.clone()),
            store,
            inventory,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn inventory(&self) -> &C {
        &self.inventory
    }

    /// Books a room for `user_id`.
    ///
    /// `request_id` is claimed once on the booking side and forwarded to the
    /// inventory so both sides deduplicate on the same key.
    #[tracing::instrument(skip(self, request), fields(%user_id, %request_id, auto_select = request.auto_select))]
    pub async fn create(
        &self,
        user_id: UserId,
        request: CreateBooking,
        request_id: RequestId,
    ) -> Result<BookingView> {
        metrics::counter!("booking_saga_executions_total").increment(1);
        let started = std::time::Instant::now();

        let range = validate_period(request.start_date, request.end_date, today())?;
        self.guard.claim(&request_id).await?;
        let room_id = self.resolve_room(&request, range, &request_id).await?;

        let pending = self
            .store
            .insert_pending(NewBooking {
                uid: BookingUid::new(),
                user_id,
                room_id,
                range,
            })
            .await?;
        tracing::info!(booking_id = %pending.id, booking_uid = %pending.uid, %room_id, nights = range.nights(), "booking pending");

        let confirm = ConfirmAvailabilityRequest {
            start_date: range.start(),
            end_date: range.end(),
            booking_id: pending.uid,
            request_id: request_id.clone(),
        };
        let result = match self.inventory.confirm(room_id, &confirm).await {
            Ok(()) => match self
                .transition(&pending, BookingStatus::Pending, BookingStatus::Confirmed)
                .await
            {
                Ok(booking) => {
                    metrics::counter!("booking_confirmed_total").increment(1);
                    tracing::info!(booking_id = %booking.id, "booking confirmed");
                    Ok(booking.view())
                }
                Err(err) => {
                    tracing::error!(booking_id = %pending.id, error = %err, "could not record confirmation, compensating");
                    metrics::counter!("booking_compensations_total", "reason" => err.kind().code())
                        .increment(1);
                    self.compensate(&pending, &request_id).await;
                    Err(err)
                }
            },
            Err(err) => {
                tracing::warn!(booking_id = %pending.id, error = %err, "room confirmation failed, compensating");
                metrics::counter!("booking_compensations_total", "reason" => err.kind().code())
                    .increment(1);
                self.compensate(&pending, &request_id).await;
                Err(BookingError::Inventory(err))
            }
        };

        metrics::histogram!("booking_saga_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    /// Cancels a booking owned by `user_id`.
    ///
    /// Cancelling an already cancelled booking changes nothing. Otherwise a
    /// single release is issued and the booking is marked CANCELLED whatever
    /// the release outcome.
    #[tracing::instrument(skip(self), fields(%id, %user_id, %request_id))]
    pub async fn cancel(&self, id: BookingId, user_id: UserId, request_id: RequestId) -> Result<BookingView> {
        let booking = self.owned(id, user_id).await?;
        if booking.status == BookingStatus::Cancelled {
            tracing::debug!("booking already cancelled");
            return Ok(booking.view());
        }

        self.release_best_effort(booking.room_id, booking.uid, &request_id)
            .await;

        let cancelled = match self
            .store
            .update_status(booking.id, booking.status, BookingStatus::Cancelled)
            .await?
        {
            Some(cancelled) => cancelled,
            // Lost a race; fine as long as somebody else cancelled it.
            None => match self.store.get(booking.id).await? {
                Some(current) if current.status == BookingStatus::Cancelled => current,
                _ => {
                    return Err(BookingError::StaleStatus {
                        id: booking.id,
                        expected: booking.status,
                    });
                }
            },
        };
        metrics::counter!("booking_cancelled_total").increment(1);
        tracing::info!("booking cancelled");
        Ok(cancelled.view())
    }

    /// Loads a booking owned by `user_id`.
    pub async fn get(&self, id: BookingId, user_id: UserId) -> Result<BookingView> {
        Ok(self.owned(id, user_id).await?.view())
    }

    /// Lists a user's bookings, newest first.
    pub async fn list(&self, user_id: UserId, page: PageRequest) -> Result<Page<BookingView>> {
        Ok(self
            .store
            .list_by_user(user_id, page)
            .await?
            .map(|b| b.view()))
    }

    async fn resolve_room(
        &self,
        request: &CreateBooking,
        range: DateRange,
        request_id: &RequestId,
    ) -> Result<RoomId> {
        if !request.auto_select {
            return request.room_id.ok_or_else(|| {
                BookingError::Validation("roomId is required when autoSelect=false".to_string())
            });
        }

        let rooms = self.inventory.recommend(range, request_id).await?;
        let room = rooms.first().ok_or(BookingError::NoRoomsAvailable)?;
        tracing::debug!(room_id = %room.id, times_booked = room.times_booked, "room auto-selected");
        Ok(room.id)
    }

    /// Another user's booking is reported as missing.
    async fn owned(&self, id: BookingId, user_id: UserId) -> Result<Booking> {
        match self.store.get(id).await? {
            Some(booking) if booking.user_id == user_id => Ok(booking),
            _ => Err(BookingError::NotFound(id)),
        }
    }

    async fn transition(
        &self,
        booking: &Booking,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking> {
        self.store
            .update_status(booking.id, from, to)
            .await?
            .ok_or(BookingError::StaleStatus {
                id: booking.id,
                expected: from,
            })
    }

    /// Marks a PENDING booking CANCELLED and releases its room.
    ///
    /// Both steps are attempted and neither failure reaches the caller, who
    /// gets the error that triggered compensation.
    async fn compensate(&self, pending: &Booking, request_id: &RequestId) {
        if let Err(err) = self
            .transition(pending, BookingStatus::Pending, BookingStatus::Cancelled)
            .await
        {
            metrics::counter!("booking_status_write_failures_total").increment(1);
            tracing::error!(booking_id = %pending.id, error = %err, "could not mark booking cancelled");
        }
        self.release_best_effort(pending.room_id, pending.uid, request_id)
            .await;
    }

    /// Releases the room lock, logging and discarding any failure.
    ///
    /// A failed release leaves a lock behind until it is reconciled out of
    /// band; the caller never sees the error and it is not retried here.
    async fn release_best_effort(&self, room_id: RoomId, booking_uid: BookingUid, request_id: &RequestId) {
        if let Err(err) = self.inventory.release(room_id, booking_uid, request_id).await {
            metrics::counter!("booking_release_failures_total").increment(1);
            tracing::error!(%room_id, %booking_uid, error = %err, "room release failed, lock left for reconciliation");
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Checks a requested stay and turns it into a range.
pub fn validate_period(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(BookingError::Validation(
            "startDate and endDate are required".to_string(),
        ));
    };
    let range = DateRange::new(start, end)?;
    if start < today {
        return Err(BookingError::Validation(
            "Invalid dates: startDate must be today or later".to_string(),
        ));
    }
    Ok(range)
}
