//! Integration tests for the booking saga against an in-process inventory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use booking::{
    Booking, BookingError, BookingSaga, BookingStatus, BookingStore, ClientError, CreateBooking,
    InMemoryBookingStore, InventoryCalls, LocalInventoryClient, NewBooking, Page, PageRequest,
    RetryPolicy,
};
use chrono::{Days, NaiveDate, Utc};
use common::{BookingId, ErrorKind, HotelId, RequestId, RoomId, UserId};
use inventory::{InMemoryRoomStore, NewRoom, RoomLockManager, RoomStore};

type TestSaga = BookingSaga<InMemoryBookingStore, LocalInventoryClient<InMemoryRoomStore>>;

struct TestHarness {
    saga: Arc<TestSaga>,
    bookings: Arc<InMemoryBookingStore>,
    rooms: InMemoryRoomStore,
    inventory: LocalInventoryClient<InMemoryRoomStore>,
}

impl TestHarness {
    async fn with_rooms(count: usize) -> Self {
        Self::build(count, RetryPolicy::no_retry()).await
    }

    async fn build(count: usize, retry: RetryPolicy) -> Self {
        let rooms = InMemoryRoomStore::new();
        for n in 0..count {
            rooms
                .insert_room(NewRoom::new(HotelId::new(1), format!("10{n}")))
                .await
                .unwrap();
        }
        let inventory =
            LocalInventoryClient::new(Arc::new(RoomLockManager::new(rooms.clone()))).with_retry(retry);
        let bookings = Arc::new(InMemoryBookingStore::new());
        let saga = Arc::new(BookingSaga::new(bookings.clone(), inventory.clone()));

        Self {
            saga,
            bookings,
            rooms,
            inventory,
        }
    }

    fn calls(&self) -> InventoryCalls {
        self.inventory.calls()
    }

    async fn lock_count(&self) -> usize {
        self.rooms.lock_count().await
    }

    async fn status_of(&self, id: BookingId) -> BookingStatus {
        self.bookings.all().await.into_iter().find(|b| b.id == id).unwrap().status
    }

    async fn only_booking_status(&self) -> BookingStatus {
        let all = self.bookings.all().await;
        assert_eq!(all.len(), 1);
        all[0].status
    }
}

fn days_from_today(days: u64) -> NaiveDate {
    Utc::now().date_naive().checked_add_days(Days::new(days)).unwrap()
}

fn user() -> UserId {
    UserId::new(7)
}

#[tokio::test]
async fn auto_select_books_the_only_free_room() {
    let h = TestHarness::with_rooms(1).await;

    let view = h
        .saga
        .create(
            user(),
            CreateBooking::auto(days_from_today(1), days_from_today(6)),
            RequestId::new("auto-1"),
        )
        .await
        .unwrap();

    assert_eq!(view.status, BookingStatus::Confirmed);
    assert_eq!(view.room_id, RoomId::new(1));
    assert_eq!(
        h.calls(),
        InventoryCalls {
            recommend: 1,
            confirm: 1,
            release: 0
        }
    );
    assert_eq!(h.lock_count().await, 1);
}

#[tokio::test]
async fn auto_select_prefers_least_booked_room() {
    let h = TestHarness::with_rooms(2).await;
    h.saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(20), days_from_today(22)),
            RequestId::new("warmup"),
        )
        .await
        .unwrap();

    let view = h
        .saga
        .create(
            user(),
            CreateBooking::auto(days_from_today(1), days_from_today(3)),
            RequestId::new("auto-2"),
        )
        .await
        .unwrap();

    assert_eq!(view.room_id, RoomId::new(2));
}

#[tokio::test]
async fn auto_select_without_free_rooms_is_a_conflict_with_no_booking() {
    let h = TestHarness::with_rooms(0).await;

    let err = h
        .saga
        .create(
            user(),
            CreateBooking::auto(days_from_today(1), days_from_today(2)),
            RequestId::new("none"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::NoRoomsAvailable));
    assert_eq!(err.to_string(), "No available rooms for this period");
    assert_eq!(h.bookings.booking_count().await, 0);
    assert_eq!(h.calls().confirm, 0);
}

#[tokio::test]
async fn duplicate_request_id_makes_no_remote_calls() {
    let h = TestHarness::with_rooms(2).await;
    let body = CreateBooking::auto(days_from_today(1), days_from_today(3));

    h.saga
        .create(user(), body.clone(), RequestId::new("dup"))
        .await
        .unwrap();
    let before = h.calls();

    let err = h
        .saga
        .create(user(), body, RequestId::new("dup"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Duplicate request: X-Request-Id=dup");
    assert_eq!(h.calls(), before);
    assert_eq!(h.bookings.booking_count().await, 1);
}

#[tokio::test]
async fn invalid_input_has_no_side_effects() {
    let h = TestHarness::with_rooms(1).await;

    let cases = [
        CreateBooking {
            start_date: None,
            end_date: Some(days_from_today(2)),
            auto_select: true,
            room_id: None,
        },
        CreateBooking::auto(days_from_today(3), days_from_today(3)),
        CreateBooking::auto(days_from_today(0).pred_opt().unwrap(), days_from_today(2)),
        CreateBooking {
            start_date: Some(days_from_today(1)),
            end_date: Some(days_from_today(2)),
            auto_select: false,
            room_id: None,
        },
    ];

    for (i, body) in cases.into_iter().enumerate() {
        let err = h
            .saga
            .create(user(), body, RequestId::new(format!("bad-{i}")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "case {i}: {err}");
    }

    assert_eq!(h.bookings.booking_count().await, 0);
    assert_eq!(h.calls(), InventoryCalls::default());
}

#[tokio::test]
async fn conflict_on_confirm_cancels_and_releases_once_without_retry() {
    let h = TestHarness::build(1, RetryPolicy::new(3, vec![Duration::from_millis(1)])).await;
    h.inventory
        .fail_confirm_with(Some(ClientError::Conflict(Some(
            "Room is not available for this period".into(),
        ))))
        .await;

    let err = h
        .saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(4)),
            RequestId::new("conflict"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Room is not available for this period");
    assert_eq!(h.calls().confirm, 1);
    assert_eq!(h.calls().release, 1);
    assert_eq!(h.only_booking_status().await, BookingStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn unreachable_inventory_is_retried_then_compensated() {
    let h = TestHarness::build(
        1,
        RetryPolicy::new(
            3,
            vec![
                Duration::from_millis(200),
                Duration::from_millis(500),
                Duration::from_millis(1000),
            ],
        ),
    )
    .await;
    h.inventory
        .fail_confirm_with(Some(ClientError::Transport("read timed out".into())))
        .await;

    let err = h
        .saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(4)),
            RequestId::new("timeout"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert_eq!(h.calls().confirm, 3);
    assert_eq!(h.calls().release, 1);
    assert_eq!(h.only_booking_status().await, BookingStatus::Cancelled);
}

#[tokio::test]
async fn failing_release_during_compensation_is_swallowed() {
    let h = TestHarness::with_rooms(1).await;
    h.inventory
        .fail_confirm_with(Some(ClientError::Conflict(None)))
        .await;
    h.inventory
        .fail_release_with(Some(ClientError::Unauthorized))
        .await;

    let err = h
        .saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(2)),
            RequestId::new("swallow"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.calls().release, 1);
    assert_eq!(h.only_booking_status().await, BookingStatus::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_manual_bookings_of_one_room_have_one_winner() {
    let h = TestHarness::with_rooms(1).await;
    let body = CreateBooking::for_room(RoomId::new(1), days_from_today(2), days_from_today(5));

    let a = {
        let saga = h.saga.clone();
        let body = body.clone();
        tokio::spawn(async move { saga.create(UserId::new(1), body, RequestId::new("a")).await })
    };
    let b = {
        let saga = h.saga.clone();
        tokio::spawn(async move { saga.create(UserId::new(2), body, RequestId::new("b")).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    let confirmed: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Conflict))
        .count();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].status, BookingStatus::Confirmed);
    assert_eq!(conflicts, 1);

    let statuses: Vec<_> = h.bookings.all().await.iter().map(|b| b.status).collect();
    assert!(statuses.contains(&BookingStatus::Confirmed));
    assert!(statuses.contains(&BookingStatus::Cancelled));
    assert_eq!(h.lock_count().await, 1);
    assert_eq!(h.calls().release, 1);
}

#[tokio::test]
async fn cancel_releases_room_and_is_idempotent() {
    let h = TestHarness::with_rooms(1).await;
    let view = h
        .saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(3)),
            RequestId::new("to-cancel"),
        )
        .await
        .unwrap();

    let cancelled = h
        .saga
        .cancel(view.id, user(), RequestId::new("cancel-1"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(h.lock_count().await, 0);
    assert_eq!(h.calls().release, 1);

    let again = h
        .saga
        .cancel(view.id, user(), RequestId::new("cancel-2"))
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Cancelled);
    assert_eq!(h.calls().release, 1);

    let room = h.rooms.get_room(RoomId::new(1)).await.unwrap().unwrap();
    assert_eq!(room.times_booked, 0);
}

#[tokio::test]
async fn cancel_marks_cancelled_even_if_release_fails() {
    let h = TestHarness::with_rooms(1).await;
    let view = h
        .saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(3)),
            RequestId::new("keep-lock"),
        )
        .await
        .unwrap();
    h.inventory
        .fail_release_with(Some(ClientError::Unavailable {
            operation: "release",
            attempts: 1,
        }))
        .await;

    let cancelled = h
        .saga
        .cancel(view.id, user(), RequestId::new("cancel"))
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(h.status_of(view.id).await, BookingStatus::Cancelled);
    // The lock stays until reconciled out of band.
    assert_eq!(h.lock_count().await, 1);
}

#[tokio::test]
async fn other_users_bookings_are_invisible() {
    let h = TestHarness::with_rooms(1).await;
    let view = h
        .saga
        .create(
            user(),
            CreateBooking::auto(days_from_today(1), days_from_today(2)),
            RequestId::new("mine"),
        )
        .await
        .unwrap();
    let stranger = UserId::new(99);

    let err = h.saga.get(view.id, stranger).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .saga
        .cancel(view.id, stranger, RequestId::new("steal"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.status_of(view.id).await, BookingStatus::Confirmed);

    let page = h.saga.list(stranger, PageRequest::default()).await.unwrap();
    assert_eq!(page.total_elements, 0);
    assert_eq!(h.saga.get(view.id, user()).await.unwrap(), view);
}

#[tokio::test]
async fn list_pages_newest_first() {
    let h = TestHarness::with_rooms(3).await;
    for i in 0..3u64 {
        h.saga
            .create(
                user(),
                CreateBooking::auto(days_from_today(1 + i * 10), days_from_today(2 + i * 10)),
                RequestId::new(format!("list-{i}")),
            )
            .await
            .unwrap();
    }

    let page = h.saga.list(user(), PageRequest::new(0, 2)).await.unwrap();

    assert_eq!(page.total_elements, 3);
    assert_eq!(page.size, 2);
    let ids: Vec<i64> = page.content.iter().map(|b| b.id.as_i64()).collect();
    assert_eq!(ids, vec![3, 2]);
}

#[tokio::test]
async fn no_booking_is_left_pending() {
    let h = TestHarness::with_rooms(1).await;
    h.saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(5)),
            RequestId::new("p-1"),
        )
        .await
        .unwrap();
    for (i, room) in [1, 42].into_iter().enumerate() {
        let _ = h
            .saga
            .create(
                user(),
                CreateBooking::for_room(RoomId::new(room), days_from_today(2), days_from_today(3)),
                RequestId::new(format!("p-fail-{i}")),
            )
            .await;
    }

    let all = h.bookings.all().await;
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|b| b.status != BookingStatus::Pending));
}

/// Booking store whose status writes to one target status always fail.
struct FailingStatusWrites {
    inner: Arc<InMemoryBookingStore>,
    fail_to: BookingStatus,
}

#[async_trait]
impl BookingStore for FailingStatusWrites {
    async fn insert_request(&self, request_id: &RequestId) -> booking::Result<()> {
        self.inner.insert_request(request_id).await
    }

    async fn insert_pending(&self, booking: NewBooking) -> booking::Result<Booking> {
        self.inner.insert_pending(booking).await
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> booking::Result<Option<Booking>> {
        if to == self.fail_to {
            return Err(BookingError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.update_status(id, from, to).await
    }

    async fn get(&self, id: BookingId) -> booking::Result<Option<Booking>> {
        self.inner.get(id).await
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> booking::Result<Page<Booking>> {
        self.inner.list_by_user(user_id, page).await
    }
}

async fn saga_with_failing_writes(
    fail_to: BookingStatus,
) -> (
    BookingSaga<FailingStatusWrites, LocalInventoryClient<InMemoryRoomStore>>,
    Arc<InMemoryBookingStore>,
    InMemoryRoomStore,
    LocalInventoryClient<InMemoryRoomStore>,
) {
    let rooms = InMemoryRoomStore::new();
    rooms
        .insert_room(NewRoom::new(HotelId::new(1), "101"))
        .await
        .unwrap();
    let inventory = LocalInventoryClient::new(Arc::new(RoomLockManager::new(rooms.clone())));
    let bookings = Arc::new(InMemoryBookingStore::new());
    let store = FailingStatusWrites {
        inner: bookings.clone(),
        fail_to,
    };
    let saga = BookingSaga::new(Arc::new(store), inventory.clone());
    (saga, bookings, rooms, inventory)
}

#[tokio::test]
async fn failed_confirmation_write_releases_room_and_cancels() {
    let (saga, bookings, rooms, inventory) =
        saga_with_failing_writes(BookingStatus::Confirmed).await;

    let err = saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(3)),
            RequestId::new("confirm-write"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(inventory.calls().confirm, 1);
    assert_eq!(inventory.calls().release, 1);
    assert_eq!(rooms.lock_count().await, 0);
    let all = bookings.all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn failed_cancel_write_still_reports_the_inventory_conflict() {
    let (saga, _bookings, _rooms, inventory) =
        saga_with_failing_writes(BookingStatus::Cancelled).await;
    inventory
        .fail_confirm_with(Some(ClientError::Conflict(Some(
            "Room is not available for this period".into(),
        ))))
        .await;

    let err = saga
        .create(
            user(),
            CreateBooking::for_room(RoomId::new(1), days_from_today(1), days_from_today(3)),
            RequestId::new("cancel-write"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Room is not available for this period");
    assert_eq!(inventory.calls().release, 1);
}
