//! In-process inventory client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use common::{BookingUid, ConfirmAvailabilityRequest, DateRange, ErrorKind, RequestId, RoomId, RoomView};
use inventory::{InventoryError, RoomLockManager, RoomStore};
use tokio::sync::RwLock;

use super::{ClientError, InventoryClient, OP_CONFIRM, OP_RECOMMEND, OP_RELEASE, RetryPolicy};

/// Number of attempts made per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryCalls {
    pub recommend: u32,
    pub confirm: u32,
    pub release: u32,
}

#[derive(Debug, Default)]
struct Counters {
    recommend: AtomicU32,
    confirm: AtomicU32,
    release: AtomicU32,
}

#[derive(Debug, Default)]
struct Faults {
    confirm: Option<ClientError>,
    release: Option<ClientError>,
}

/// Calls a [`RoomLockManager`] directly, through the same retry envelope
/// as the HTTP adapter.
///
/// Every attempt is counted, and failures can be injected per operation to
/// exercise the saga's compensation paths.
pub struct LocalInventoryClient<S: RoomStore> {
    manager: Arc<RoomLockManager<S>>,
    retry: RetryPolicy,
    counters: Arc<Counters>,
    faults: Arc<RwLock<Faults>>,
}

impl<S: RoomStore> Clone for LocalInventoryClient<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            retry: self.retry.clone(),
            counters: self.counters.clone(),
            faults: self.faults.clone(),
        }
    }
}

impl<S: RoomStore> LocalInventoryClient<S> {
    /// Wraps a manager with a single-attempt policy.
    pub fn new(manager: Arc<RoomLockManager<S>>) -> Self {
        Self {
            manager,
            retry: RetryPolicy::no_retry(),
            counters: Arc::default(),
            faults: Arc::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn manager(&self) -> &RoomLockManager<S> {
        &self.manager
    }

    /// Makes every confirm attempt fail with `error` until cleared.
    pub async fn fail_confirm_with(&self, error: Option<ClientError>) {
        self.faults.write().await.confirm = error;
    }

    /// Makes every release attempt fail with `error` until cleared.
    pub async fn fail_release_with(&self, error: Option<ClientError>) {
        self.faults.write().await.release = error;
    }

    /// Attempts made so far.
    pub fn calls(&self) -> InventoryCalls {
        InventoryCalls {
            recommend: self.counters.recommend.load(Ordering::SeqCst),
            confirm: self.counters.confirm.load(Ordering::SeqCst),
            release: self.counters.release.load(Ordering::SeqCst),
        }
    }
}

fn to_client_error(err: InventoryError) -> ClientError {
    let message = Some(err.public_message());
    match err.kind() {
        ErrorKind::BadRequest => ClientError::BadRequest(message),
        ErrorKind::Unauthorized => ClientError::Unauthorized,
        ErrorKind::NotFound => ClientError::NotFound,
        ErrorKind::Conflict => ClientError::Conflict(message),
        ErrorKind::ServiceUnavailable | ErrorKind::Internal => ClientError::UnexpectedStatus {
            status: err.kind().status_code(),
            message,
        },
    }
}

#[async_trait]
impl<S: RoomStore + 'static> InventoryClient for LocalInventoryClient<S> {
    async fn recommend(
        &self,
        range: DateRange,
        _request_id: &RequestId,
    ) -> Result<Vec<RoomView>, ClientError> {
        self.retry
            .run(OP_RECOMMEND, |_| async move {
                self.counters.recommend.fetch_add(1, Ordering::SeqCst);
                self.manager.recommend(range).await.map_err(to_client_error)
            })
            .await
    }

    async fn confirm(
        &self,
        room_id: RoomId,
        request: &ConfirmAvailabilityRequest,
    ) -> Result<(), ClientError> {
        self.retry
            .run(OP_CONFIRM, |_| async move {
                self.counters.confirm.fetch_add(1, Ordering::SeqCst);
                if let Some(fault) = self.faults.read().await.confirm.clone() {
                    return Err(fault);
                }
                let range = DateRange::new(request.start_date, request.end_date)
                    .map_err(|e| ClientError::BadRequest(Some(e.to_string())))?;
                self.manager
                    .confirm(room_id, range, request.booking_id, request.request_id.clone())
                    .await
                    .map(|_| ())
                    .map_err(to_client_error)
            })
            .await
    }

    async fn release(
        &self,
        room_id: RoomId,
        booking_uid: BookingUid,
        _request_id: &RequestId,
    ) -> Result<(), ClientError> {
        self.retry
            .run(OP_RELEASE, |_| async move {
                self.counters.release.fetch_add(1, Ordering::SeqCst);
                if let Some(fault) = self.faults.read().await.release.clone() {
                    return Err(fault);
                }
                self.manager
                    .release(room_id, booking_uid)
                    .await
                    .map(|_| ())
                    .map_err(to_client_error)
            })
            .await
    }
}
