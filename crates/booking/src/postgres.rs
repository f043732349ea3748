use async_trait::async_trait;
use chrono::NaiveDate;
use common::{BookingId, BookingUid, DateRange, RequestId, RoomId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Booking, BookingError, BookingStatus, NewBooking, Page, PageRequest, Result,
    store::BookingStore,
};

const BOOKING_COLUMNS: &str =
    "id, booking_uid, user_id, room_id, start_date, end_date, status, created_at";

/// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the booking migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/booking")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let start: NaiveDate = row.try_get("start_date")?;
        let end: NaiveDate = row.try_get("end_date")?;
        let status: String = row.try_get("status")?;
        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            uid: BookingUid::from_uuid(row.try_get::<Uuid, _>("booking_uid")?),
            user_id: UserId::new(row.try_get("user_id")?),
            room_id: RoomId::new(row.try_get("room_id")?),
            range: DateRange::new(start, end)?,
            status: status.parse().map_err(|e: String| {
                BookingError::Database(sqlx::Error::Decode(e.into()))
            })?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn insert_request(&self, request_id: &RequestId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query("INSERT INTO request_log (request_id) VALUES ($1)")
            .bind(request_id.as_str())
            .execute(&mut *tx)
            .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.constraint() == Some("request_log_pkey") =>
            {
                Err(BookingError::DuplicateRequest(request_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO bookings (booking_uid, user_id, room_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.uid.as_uuid())
        .bind(booking.user_id.as_i64())
        .bind(booking.room_id.as_i64())
        .bind(booking.range.start())
        .bind(booking.range.end())
        .bind(BookingStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_booking(row)
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings SET status = $3
            WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.as_i64())
        .bind(i64::from(page.size))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let content = rows
            .into_iter()
            .map(Self::row_to_booking)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            content,
            page: page.page,
            size: page.size,
            total_elements: u64::try_from(total).unwrap_or_default(),
        })
    }
}
