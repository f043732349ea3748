//! Room lock manager: the inventory half of the booking saga.

use common::{BookingUid, DateRange, RequestId, RoomId, RoomView};

use crate::hold::RoomHolds;
use crate::store::RoomStore;
use crate::{InventoryError, NewRoomLock, Result, Room, RoomLock};

/// What a successful confirm did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// A new lock was created and the fairness counter incremented.
    Locked(RoomLock),
    /// The request id had already been processed; nothing changed.
    AlreadyConfirmed(RoomLock),
}

impl ConfirmOutcome {
    pub fn lock(&self) -> &RoomLock {
        match self {
            ConfirmOutcome::Locked(lock) | ConfirmOutcome::AlreadyConfirmed(lock) => lock,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ConfirmOutcome::Locked(_) => "locked",
            ConfirmOutcome::AlreadyConfirmed(_) => "idempotent",
        }
    }
}

/// What a release did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    /// No lock for this booking on this room; nothing changed.
    NothingToRelease,
}

/// Owns rooms and room locks.
///
/// Every confirm and release on a room runs under that room's hold, so the
/// idempotency lookup, the overlap check and the insert observe one
/// consistent view of the room's locks.
pub struct RoomLockManager<S: RoomStore> {
    store: S,
    holds: RoomHolds,
}

impl<S: RoomStore> RoomLockManager<S> {
    /// Creates a manager with its own hold table.
    pub fn new(store: S) -> Self {
        Self::with_holds(store, RoomHolds::new())
    }

    /// Creates a manager sharing an existing hold table.
    pub fn with_holds(store: S, holds: RoomHolds) -> Self {
        Self { store, holds }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an exclusive lock on `room_id` for `range`.
    ///
    /// Repeating a request id returns the existing lock without touching the
    /// fairness counter.
    #[tracing::instrument(skip(self), fields(%room_id, %range, %booking_uid, %request_id))]
    pub async fn confirm(
        &self,
        room_id: RoomId,
        range: DateRange,
        booking_uid: BookingUid,
        request_id: RequestId,
    ) -> Result<ConfirmOutcome> {
        let result = self
            .confirm_under_hold(room_id, range, booking_uid, request_id)
            .await;

        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(InventoryError::RoomUnavailable { .. }) => "unavailable",
            Err(InventoryError::RoomNotOperational(_)) => "not_operational",
            Err(_) => "error",
        };
        metrics::counter!("room_lock_confirm_total", "outcome" => outcome).increment(1);

        result
    }

    async fn confirm_under_hold(
        &self,
        room_id: RoomId,
        range: DateRange,
        booking_uid: BookingUid,
        request_id: RequestId,
    ) -> Result<ConfirmOutcome> {
        let _hold = self.holds.acquire(room_id).await;

        let room = self.require_room(room_id).await?;

        // Checked only once the hold is taken, so two retries of the same
        // request cannot both pass the lookup.
        if let Some(existing) = self.store.find_lock_by_request(&request_id).await? {
            tracing::debug!(lock_id = existing.id, "confirm idempotent hit");
            return Ok(ConfirmOutcome::AlreadyConfirmed(existing));
        }

        if !room.operational {
            return Err(InventoryError::RoomNotOperational(room_id));
        }

        let overlapping = self.store.find_overlapping_locks(room_id, range).await?;
        if !overlapping.is_empty() {
            tracing::info!(conflicts = overlapping.len(), "room not available for period");
            return Err(InventoryError::RoomUnavailable { room_id, range });
        }

        let new_lock = NewRoomLock {
            room_id,
            range,
            booking_uid,
            request_id: request_id.clone(),
        };
        match self.store.insert_lock(new_lock).await {
            Ok(lock) => {
                tracing::info!(lock_id = lock.id, "room locked");
                Ok(ConfirmOutcome::Locked(lock))
            }
            Err(err @ InventoryError::DuplicateLock { .. }) => {
                match self.store.find_lock_by_request(&request_id).await? {
                    Some(existing) => {
                        tracing::debug!(lock_id = existing.id, "confirm idempotent after insert race");
                        Ok(ConfirmOutcome::AlreadyConfirmed(existing))
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Drops the lock held for `booking_uid` on `room_id`, if any.
    ///
    /// Unknown bookings and locks belonging to another room are a no-op; an
    /// unknown room is `RoomNotFound`.
    #[tracing::instrument(skip(self), fields(%room_id, %booking_uid))]
    pub async fn release(&self, room_id: RoomId, booking_uid: BookingUid) -> Result<ReleaseOutcome> {
        let _hold = self.holds.acquire(room_id).await;

        self.require_room(room_id).await?;

        let Some(lock) = self.store.find_lock_by_booking(booking_uid).await? else {
            tracing::debug!("no lock to release");
            return Ok(ReleaseOutcome::NothingToRelease);
        };
        if lock.room_id != room_id {
            tracing::warn!(lock_room_id = %lock.room_id, "lock belongs to another room, ignoring");
            return Ok(ReleaseOutcome::NothingToRelease);
        }

        if self.store.delete_lock(&lock).await? {
            metrics::counter!("room_lock_release_total").increment(1);
            tracing::info!(lock_id = lock.id, "room lock released");
            Ok(ReleaseOutcome::Released)
        } else {
            Ok(ReleaseOutcome::NothingToRelease)
        }
    }

    /// Operational rooms with no lock overlapping `range`, ordered by id.
    #[tracing::instrument(skip(self), fields(%range))]
    pub async fn list_available(&self, range: DateRange) -> Result<Vec<RoomView>> {
        let rooms = self.store.list_operational_rooms().await?;
        let mut available = Vec::with_capacity(rooms.len());
        for room in rooms {
            if self
                .store
                .find_overlapping_locks(room.id, range)
                .await?
                .is_empty()
            {
                available.push(room.view());
            }
        }
        available.sort_by_key(|r| r.id);
        Ok(available)
    }

    /// Available rooms, least booked first, ties broken by ascending id.
    ///
    /// Auto-select takes the first entry, so this order is part of the
    /// contract with the booking service.
    pub async fn recommend(&self, range: DateRange) -> Result<Vec<RoomView>> {
        let mut rooms = self.list_available(range).await?;
        rooms.sort_by_key(|r| (r.times_booked, r.id));
        Ok(rooms)
    }

    /// Loads a single room.
    pub async fn get_room(&self, room_id: RoomId) -> Result<RoomView> {
        Ok(self.require_room(room_id).await?.view())
    }

    async fn require_room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or(InventoryError::RoomNotFound(room_id))
    }
}
