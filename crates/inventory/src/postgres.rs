use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingUid, DateRange, HotelId, RequestId, RoomId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{InventoryError, NewRoom, NewRoomLock, Result, Room, RoomLock, store::RoomStore};

const LOCK_COLUMNS: &str =
    "id, room_id, start_date, end_date, booking_uid, request_id, created_at";

/// PostgreSQL-backed room store.
///
/// Besides the unique keys, the schema carries an exclusion constraint on
/// `(room_id, daterange)`, so overlapping locks cannot be committed even by
/// two inventory processes that do not share a [`crate::RoomHolds`] table.
#[derive(Clone)]
pub struct PostgresRoomStore {
    pool: PgPool,
}

impl PostgresRoomStore {
    /// Creates a new PostgreSQL room store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the inventory migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/inventory")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_room(row: PgRow) -> Result<Room> {
        Ok(Room {
            id: RoomId::new(row.try_get("id")?),
            hotel_id: HotelId::new(row.try_get("hotel_id")?),
            number: row.try_get("number")?,
            operational: row.try_get("operational")?,
            times_booked: row.try_get("times_booked")?,
        })
    }

    fn row_to_lock(row: PgRow) -> Result<RoomLock> {
        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        Ok(RoomLock {
            id: row.try_get("id")?,
            room_id: RoomId::new(row.try_get("room_id")?),
            range: DateRange::new(start, end)?,
            booking_uid: BookingUid::from_uuid(row.try_get::<Uuid, _>("booking_uid")?),
            request_id: RequestId::new(row.try_get::<String, _>("request_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

fn map_insert_error(err: sqlx::Error, lock: &NewRoomLock) -> InventoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.constraint() {
            Some("room_locks_no_overlap") => {
                return InventoryError::RoomUnavailable {
                    room_id: lock.room_id,
                    range: lock.range,
                };
            }
            Some("room_locks_room_id_fkey") => return InventoryError::RoomNotFound(lock.room_id),
            Some(name @ ("room_locks_booking_uid_key" | "room_locks_request_id_key")) => {
                return InventoryError::DuplicateLock {
                    constraint: name.to_string(),
                };
            }
            _ => {}
        }
    }
    InventoryError::Database(err)
}

#[async_trait]
impl RoomStore for PostgresRoomStore {
    async fn insert_room(&self, room: NewRoom) -> Result<Room> {
        let row = sqlx::query(
            r#"
            INSERT INTO rooms (hotel_id, number, operational, times_booked)
            VALUES ($1, $2, $3, 0)
            RETURNING id, hotel_id, number, operational, times_booked
            "#,
        )
        .bind(room.hotel_id.as_i64())
        .bind(&room.number)
        .bind(room.operational)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_room(row)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, hotel_id, number, operational, times_booked FROM rooms WHERE id = $1",
        )
        .bind(room_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_room).transpose()
    }

    async fn list_operational_rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query(
            r#"
            SELECT id, hotel_id, number, operational, times_booked
            FROM rooms
            WHERE operational = TRUE
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_room).collect()
    }

    async fn room_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn find_lock_by_request(&self, request_id: &RequestId) -> Result<Option<RoomLock>> {
        let row = sqlx::query(&format!(
            "SELECT {LOCK_COLUMNS} FROM room_locks WHERE request_id = $1"
        ))
        .bind(request_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_lock).transpose()
    }

    async fn find_lock_by_booking(&self, booking_uid: BookingUid) -> Result<Option<RoomLock>> {
        let row = sqlx::query(&format!(
            "SELECT {LOCK_COLUMNS} FROM room_locks WHERE booking_uid = $1"
        ))
        .bind(booking_uid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_lock).transpose()
    }

    async fn find_overlapping_locks(
        &self,
        room_id: RoomId,
        range: DateRange,
    ) -> Result<Vec<RoomLock>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LOCK_COLUMNS}
            FROM room_locks
            WHERE room_id = $1 AND NOT (end_date <= $2 OR start_date >= $3)
            ORDER BY start_date ASC
            "#
        ))
        .bind(room_id.as_i64())
        .bind(range.start())
        .bind(range.end())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lock).collect()
    }

    async fn list_locks_for_room(&self, room_id: RoomId) -> Result<Vec<RoomLock>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOCK_COLUMNS} FROM room_locks WHERE room_id = $1 ORDER BY start_date ASC"
        ))
        .bind(room_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_lock).collect()
    }

    async fn insert_lock(&self, lock: NewRoomLock) -> Result<RoomLock> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO room_locks (room_id, start_date, end_date, booking_uid, request_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LOCK_COLUMNS}
            "#
        ))
        .bind(lock.room_id.as_i64())
        .bind(lock.range.start())
        .bind(lock.range.end())
        .bind(lock.booking_uid.as_uuid())
        .bind(lock.request_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, &lock))?;

        sqlx::query("UPDATE rooms SET times_booked = times_booked + 1 WHERE id = $1")
            .bind(lock.room_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Self::row_to_lock(row)
    }

    async fn delete_lock(&self, lock: &RoomLock) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM room_locks WHERE id = $1")
            .bind(lock.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE rooms SET times_booked = GREATEST(times_booked - 1, 0) WHERE id = $1")
            .bind(lock.room_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
