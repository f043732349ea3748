use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BookingUid, DateRange, RequestId, RoomId};
use tokio::sync::RwLock;

use crate::{InventoryError, NewRoom, NewRoomLock, Result, Room, RoomLock, store::RoomStore};

#[derive(Debug, Default)]
struct State {
    rooms: BTreeMap<RoomId, Room>,
    locks: Vec<RoomLock>,
    next_room_id: i64,
    next_lock_id: i64,
    racing_insert: bool,
}

/// In-memory room store for tests and single-process runs.
///
/// Enforces the same uniqueness rules as the PostgreSQL schema.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoomStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryRoomStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of locks held.
    pub async fn lock_count(&self) -> usize {
        self.state.read().await.locks.len()
    }

    /// Makes the next `insert_lock` behave as if a concurrent writer had
    /// committed the same lock first: the lock is stored, but the call fails
    /// with a uniqueness violation.
    pub async fn simulate_racing_insert(&self) {
        self.state.write().await.racing_insert = true;
    }
}

fn check_unique(locks: &[RoomLock], lock: &NewRoomLock) -> Result<()> {
    if locks.iter().any(|l| l.booking_uid == lock.booking_uid) {
        return Err(InventoryError::DuplicateLock {
            constraint: "room_locks_booking_uid_key".to_string(),
        });
    }
    if locks.iter().any(|l| l.request_id == lock.request_id) {
        return Err(InventoryError::DuplicateLock {
            constraint: "room_locks_request_id_key".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn insert_room(&self, room: NewRoom) -> Result<Room> {
        let mut state = self.state.write().await;
        state.next_room_id += 1;
        let room = Room {
            id: RoomId::new(state.next_room_id),
            hotel_id: room.hotel_id,
            number: room.number,
            operational: room.operational,
            times_booked: 0,
        };
        state.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&room_id).cloned())
    }

    async fn list_operational_rooms(&self) -> Result<Vec<Room>> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .values()
            .filter(|r| r.operational)
            .cloned()
            .collect())
    }

    async fn room_count(&self) -> Result<usize> {
        Ok(self.state.read().await.rooms.len())
    }

    async fn find_lock_by_request(&self, request_id: &RequestId) -> Result<Option<RoomLock>> {
        let state = self.state.read().await;
        Ok(state
            .locks
            .iter()
            .find(|l| &l.request_id == request_id)
            .cloned())
    }

    async fn find_lock_by_booking(&self, booking_uid: BookingUid) -> Result<Option<RoomLock>> {
        let state = self.state.read().await;
        Ok(state
            .locks
            .iter()
            .find(|l| l.booking_uid == booking_uid)
            .cloned())
    }

    async fn find_overlapping_locks(
        &self,
        room_id: RoomId,
        range: DateRange,
    ) -> Result<Vec<RoomLock>> {
        let state = self.state.read().await;
        Ok(state
            .locks
            .iter()
            .filter(|l| l.room_id == room_id && l.range.overlaps(&range))
            .cloned()
            .collect())
    }

    async fn list_locks_for_room(&self, room_id: RoomId) -> Result<Vec<RoomLock>> {
        let state = self.state.read().await;
        let mut locks: Vec<_> = state
            .locks
            .iter()
            .filter(|l| l.room_id == room_id)
            .cloned()
            .collect();
        locks.sort_by_key(|l| l.range.start());
        Ok(locks)
    }

    async fn insert_lock(&self, lock: NewRoomLock) -> Result<RoomLock> {
        let mut state = self.state.write().await;

        if !state.rooms.contains_key(&lock.room_id) {
            return Err(InventoryError::RoomNotFound(lock.room_id));
        }
        check_unique(&state.locks, &lock)?;

        state.next_lock_id += 1;
        let stored = RoomLock {
            id: state.next_lock_id,
            room_id: lock.room_id,
            range: lock.range,
            booking_uid: lock.booking_uid,
            request_id: lock.request_id,
            created_at: Utc::now(),
        };
        state.locks.push(stored.clone());
        if let Some(room) = state.rooms.get_mut(&stored.room_id) {
            room.times_booked += 1;
        }

        if std::mem::take(&mut state.racing_insert) {
            return Err(InventoryError::DuplicateLock {
                constraint: "room_locks_request_id_key".to_string(),
            });
        }

        Ok(stored)
    }

    async fn delete_lock(&self, lock: &RoomLock) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.locks.len();
        state.locks.retain(|l| l.id != lock.id);
        if state.locks.len() == before {
            return Ok(false);
        }
        if let Some(room) = state.rooms.get_mut(&lock.room_id) {
            room.times_booked = (room.times_booked - 1).max(0);
        }
        Ok(true)
    }
}
