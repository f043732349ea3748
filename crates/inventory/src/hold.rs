//! Per-room mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use common::RoomId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = Arc<SyncMutex<HashMap<RoomId, Arc<Mutex<()>>>>>;

/// Table of exclusive holds keyed by room id.
///
/// Acquiring a hold waits for the previous holder of the same room; holds on
/// different rooms never contend. A room's slot only lives while someone
/// holds or waits for it, so the table stays as small as the set of rooms in
/// flight.
#[derive(Debug, Clone, Default)]
pub struct RoomHolds {
    slots: Slots,
}

/// Exclusive hold on one room, released when dropped.
#[derive(Debug)]
pub struct RoomHold {
    room_id: RoomId,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomHold {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        // The table lock keeps new waiters from cloning the slot while we
        // decide whether we are its last user (table + our guard).
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) == 2 {
            slots.remove(&self.room_id);
        }
        drop(guard);
    }
}

impl RoomHolds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the room is free and takes the hold.
    pub async fn acquire(&self, room_id: RoomId) -> RoomHold {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .entry(room_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        RoomHold {
            room_id,
            slots: self.slots.clone(),
            guard: Some(slot.lock_owned().await),
        }
    }

    /// Number of rooms currently held or waited on.
    pub fn tracked_rooms(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
