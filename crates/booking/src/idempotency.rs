//! Booking-side idempotency guard.

use std::sync::Arc;

use common::RequestId;

use crate::{BookingError, Result, store::BookingStore};

/// Claims request ids exactly once.
///
/// The claim is the insert itself: whichever caller writes the request-log
/// row first wins, and every later claim of the same id (including a
/// concurrent one) fails with [`BookingError::DuplicateRequest`]. This only
/// protects the booking ledger; the inventory keeps its own per-request
/// check.
pub struct IdempotencyGuard<S: BookingStore + ?Sized> {
    store: Arc<S>,
}

impl<S: BookingStore + ?Sized> Clone for IdempotencyGuard<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: BookingStore + ?Sized> IdempotencyGuard<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(%request_id))]
    pub async fn claim(&self, request_id: &RequestId) -> Result<()> {
        match self.store.insert_request(request_id).await {
            Ok(()) => Ok(()),
            Err(err @ BookingError::DuplicateRequest(_)) => {
                tracing::info!("duplicate request rejected");
                metrics::counter!("booking_duplicate_requests_total").increment(1);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBookingStore;
    use futures_util::future::join_all;

    #[tokio::test]
    async fn second_claim_is_a_conflict() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryBookingStore::new()));
        let request = RequestId::new("rq-1");

        guard.claim(&request).await.unwrap();
        let err = guard.claim(&request).await.unwrap_err();

        assert_eq!(err.kind(), common::ErrorKind::Conflict);
        guard.claim(&RequestId::new("rq-2")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_one_winner() {
        let guard = IdempotencyGuard::new(Arc::new(InMemoryBookingStore::new()));

        let claims = (0..10).map(|_| {
            let guard = guard.clone();
            tokio::spawn(async move { guard.claim(&RequestId::new("same")).await })
        });
        let winners = join_all(claims)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(()))))
            .count();

        assert_eq!(winners, 1);
    }
}
