use async_trait::async_trait;
use common::{BookingUid, DateRange, RequestId, RoomId};

use crate::{NewRoom, NewRoomLock, Result, Room, RoomLock};

/// Persistence port for rooms and room locks.
///
/// Implementations must enforce uniqueness of `booking_uid` and `request_id`
/// across locks, reporting violations as `InventoryError::DuplicateLock`.
/// Serialization of concurrent writers per room is the caller's job (see
/// [`crate::RoomHolds`]); the store only guarantees that each method is atomic.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Inserts a room and returns it with its assigned id.
    async fn insert_room(&self, room: NewRoom) -> Result<Room>;

    /// Loads a room by id.
    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>>;

    /// Returns every room not taken out of service, ordered by id.
    async fn list_operational_rooms(&self) -> Result<Vec<Room>>;

    /// Returns the number of rooms in the store.
    async fn room_count(&self) -> Result<usize>;

    /// Finds the lock created for a request id.
    async fn find_lock_by_request(&self, request_id: &RequestId) -> Result<Option<RoomLock>>;

    /// Finds the lock held for a booking.
    async fn find_lock_by_booking(&self, booking_uid: BookingUid) -> Result<Option<RoomLock>>;

    /// Returns locks on `room_id` whose period overlaps `range`.
    async fn find_overlapping_locks(&self, room_id: RoomId, range: DateRange)
    -> Result<Vec<RoomLock>>;

    /// Returns every lock held on a room, ordered by start date.
    async fn list_locks_for_room(&self, room_id: RoomId) -> Result<Vec<RoomLock>>;

    /// Inserts a lock and increments the room's `times_booked` atomically.
    ///
    /// On a uniqueness violation nothing is written. The one exception is
    /// `InMemoryRoomStore::simulate_racing_insert`, a test hook that commits
    /// the lock and then reports the violation a racing writer would see.
    async fn insert_lock(&self, lock: NewRoomLock) -> Result<RoomLock>;

    /// Deletes a lock and decrements the room's `times_booked` (floored at 0)
    /// atomically. Returns false if the lock was already gone.
    async fn delete_lock(&self, lock: &RoomLock) -> Result<bool>;
}
