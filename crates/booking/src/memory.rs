use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BookingId, RequestId, UserId};
use tokio::sync::RwLock;

use crate::{
    Booking, BookingError, BookingStatus, NewBooking, Page, PageRequest, Result,
    store::BookingStore,
};

#[derive(Debug, Default)]
struct State {
    requests: HashSet<RequestId>,
    bookings: BTreeMap<BookingId, Booking>,
    next_id: i64,
}

/// In-memory booking store for tests and single-process runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of bookings.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }

    /// Returns every booking, ordered by id.
    pub async fn all(&self) -> Vec<Booking> {
        self.state.read().await.bookings.values().cloned().collect()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert_request(&self, request_id: &RequestId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.requests.insert(request_id.clone()) {
            return Err(BookingError::DuplicateRequest(request_id.clone()));
        }
        Ok(())
    }

    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let booking = Booking {
            id: BookingId::new(state.next_id),
            uid: booking.uid,
            user_id: booking.user_id,
            room_id: booking.room_id,
            range: booking.range,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Booking>> {
        let mut state = self.state.write().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>> {
        let state = self.state.read().await;
        let mut owned: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = owned.len() as u64;
        let content = owned
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .cloned()
            .collect();

        Ok(Page {
            content,
            page: page.page,
            size: page.size,
            total_elements: total,
        })
    }
}
