//! Demo room catalogue.

use common::HotelId;

use crate::{NewRoom, Result, store::RoomStore};

const DEMO_ROOMS: &[(i64, &str)] = &[
    (1, "101"),
    (1, "102"),
    (1, "201"),
    (2, "10"),
    (2, "11"),
    (3, "1A"),
    (3, "1B"),
    (3, "2A"),
    (3, "2B"),
];

/// Inserts the demo rooms if the store has none yet.
///
/// Returns the number of rooms inserted (zero when the store was already
/// populated).
pub async fn seed_demo_rooms<S: RoomStore + ?Sized>(store: &S) -> Result<usize> {
    if store.room_count().await? > 0 {
        tracing::debug!("room catalogue already populated, skipping seed");
        return Ok(0);
    }

    for (hotel, number) in DEMO_ROOMS {
        store
            .insert_room(NewRoom::new(HotelId::new(*hotel), *number))
            .await?;
    }
    tracing::info!(rooms = DEMO_ROOMS.len(), "seeded demo rooms");
    Ok(DEMO_ROOMS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRoomStore;

    #[tokio::test]
    async fn seeds_once() {
        let store = InMemoryRoomStore::new();

        assert_eq!(seed_demo_rooms(&store).await.unwrap(), 9);
        assert_eq!(seed_demo_rooms(&store).await.unwrap(), 0);
        assert_eq!(store.room_count().await.unwrap(), 9);
    }
}
