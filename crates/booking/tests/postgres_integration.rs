//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p booking --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use booking::{
    BookingError, BookingStatus, BookingStore, IdempotencyGuard, NewBooking, PageRequest,
    PostgresBookingStore,
};
use chrono::NaiveDate;
use common::{BookingId, BookingUid, DateRange, RequestId, RoomId, UserId};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = sqlx::PgPool::connect(&connection_string).await.unwrap();
            PostgresBookingStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresBookingStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE bookings, request_log RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresBookingStore::new(pool)
}

fn new_booking(user: i64, room: i64) -> NewBooking {
    NewBooking {
        uid: BookingUid::new(),
        user_id: UserId::new(user),
        room_id: RoomId::new(room),
        range: DateRange::new(
            NaiveDate::from_ymd_opt(2030, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 9, 3).unwrap(),
        )
        .unwrap(),
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn request_id_is_claimed_once() {
    let store = get_test_store().await;
    let request = RequestId::new("pg-claim");

    store.insert_request(&request).await.unwrap();
    let err = store.insert_request(&request).await.unwrap_err();

    assert!(matches!(err, BookingError::DuplicateRequest(ref id) if id == &request));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn concurrent_claims_have_one_winner() {
    let store = Arc::new(get_test_store().await);
    let guard = Arc::new(IdempotencyGuard::new(store));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.claim(&RequestId::new("pg-race")).await })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn pending_booking_round_trips() {
    let store = get_test_store().await;
    let new = new_booking(1, 4);

    let booking = store.insert_pending(new.clone()).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.uid, new.uid);

    let loaded = store.get(booking.id).await.unwrap().unwrap();
    assert_eq!(loaded.room_id, RoomId::new(4));
    assert_eq!(loaded.range, new.range);
    assert!(store.get(BookingId::new(999)).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn status_update_is_compare_and_set() {
    let store = get_test_store().await;
    let booking = store.insert_pending(new_booking(1, 1)).await.unwrap();

    let confirmed = store
        .update_status(booking.id, BookingStatus::Pending, BookingStatus::Confirmed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let stale = store
        .update_status(booking.id, BookingStatus::Pending, BookingStatus::Cancelled)
        .await
        .unwrap();
    assert!(stale.is_none());

    let loaded = store.get(booking.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, BookingStatus::Confirmed);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn listing_is_scoped_and_paged() {
    let store = get_test_store().await;
    for room in 1..=3 {
        store.insert_pending(new_booking(5, room)).await.unwrap();
    }
    store.insert_pending(new_booking(6, 9)).await.unwrap();

    let first = store
        .list_by_user(UserId::new(5), PageRequest::new(0, 2))
        .await
        .unwrap();
    assert_eq!(first.total_elements, 3);
    assert_eq!(first.content.len(), 2);
    assert_eq!(first.content[0].room_id, RoomId::new(3));

    let second = store
        .list_by_user(UserId::new(5), PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(second.content.len(), 1);
    assert_eq!(second.content[0].room_id, RoomId::new(1));
}
