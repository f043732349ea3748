//! Room inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRef, Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{BookingUid, ConfirmAvailabilityRequest, DateRange, RoomId, RoomView};
use inventory::{ConfirmOutcome, RoomLockManager, RoomStore};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{Correlation, ServiceAuth, ServiceToken};

/// Shared state of the inventory service.
pub struct InventoryState<R: RoomStore> {
    pub manager: RoomLockManager<R>,
    pub service_token: ServiceToken,
}

impl<R: RoomStore> FromRef<Arc<InventoryState<R>>> for ServiceToken {
    fn from_ref(state: &Arc<InventoryState<R>>) -> Self {
        state.service_token.clone()
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PeriodQuery {
    fn range(&self) -> Result<DateRange, ApiError> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(ApiError::bad_request("start and end are required"));
        };
        DateRange::new(start, end)
            .map_err(|_| ApiError::bad_request("Invalid dates: start must be before end"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseQuery {
    pub booking_id: BookingUid,
}

// -- Handlers --

/// GET /api/rooms?start&end: free operational rooms, by id.
pub async fn list_available<R: RoomStore + 'static>(
    State(state): State<Arc<InventoryState<R>>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<Vec<RoomView>>, ApiError> {
    let Query(query) = query?;
    let rooms = state.manager.list_available(query.range()?).await?;
    Ok(Json(rooms))
}

/// GET /api/rooms/recommend?start&end: free rooms, least booked first.
pub async fn recommend<R: RoomStore + 'static>(
    State(state): State<Arc<InventoryState<R>>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<Vec<RoomView>>, ApiError> {
    let Query(query) = query?;
    let rooms = state.manager.recommend(query.range()?).await?;
    Ok(Json(rooms))
}

/// GET /api/rooms/{id}
pub async fn get<R: RoomStore + 'static>(
    State(state): State<Arc<InventoryState<R>>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<RoomView>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.manager.get_room(RoomId::new(id)).await?))
}

/// POST /api/rooms/{id}/confirm-availability (service token required)
#[tracing::instrument(skip_all, fields(room_id = tracing::field::Empty, correlation_id = %correlation.0))]
pub async fn confirm_availability<R: RoomStore + 'static>(
    State(state): State<Arc<InventoryState<R>>>,
    _auth: ServiceAuth,
    correlation: Correlation,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ConfirmAvailabilityRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    tracing::Span::current().record("room_id", id);

    let range = DateRange::new(body.start_date, body.end_date)
        .map_err(|_| ApiError::bad_request("Invalid dates: startDate must be before endDate"))?;
    let outcome = state
        .manager
        .confirm(RoomId::new(id), range, body.booking_id, body.request_id)
        .await?;
    if let ConfirmOutcome::AlreadyConfirmed(lock) = outcome {
        tracing::debug!(lock_id = lock.id, "confirm replayed");
    }
    Ok(StatusCode::OK)
}

/// POST /api/rooms/{id}/release?bookingId= (service token required)
pub async fn release<R: RoomStore + 'static>(
    State(state): State<Arc<InventoryState<R>>>,
    _auth: ServiceAuth,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<ReleaseQuery>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    state
        .manager
        .release(RoomId::new(id), query.booking_id)
        .await?;
    Ok(StatusCode::OK)
}
