//! Booking endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use booking::{BookingSaga, BookingStore, BookingView, CreateBooking, InventoryClient, Page, PageRequest};
use common::BookingId;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{CallerId, Correlation};

/// Shared state of the booking service.
pub struct BookingState<S: BookingStore, C: InventoryClient> {
    pub saga: BookingSaga<S, C>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        PageRequest::new(
            query.page.unwrap_or(0),
            query.size.unwrap_or(PageRequest::DEFAULT_SIZE),
        )
    }
}

/// POST /api/booking: runs the booking saga.
#[tracing::instrument(skip_all, fields(user_id = %caller.0, request_id = %correlation.0))]
pub async fn create<S: BookingStore + 'static, C: InventoryClient + 'static>(
    State(state): State<Arc<BookingState<S, C>>>,
    caller: CallerId,
    correlation: Correlation,
    body: Result<Json<CreateBooking>, JsonRejection>,
) -> Result<Json<BookingView>, ApiError> {
    let Json(body) = body?;
    let view = state.saga.create(caller.0, body, correlation.0).await?;
    Ok(Json(view))
}

/// GET /api/bookings?page&size: the caller's bookings, newest first.
pub async fn list<S: BookingStore + 'static, C: InventoryClient + 'static>(
    State(state): State<Arc<BookingState<S, C>>>,
    CallerId(user_id): CallerId,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<BookingView>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.saga.list(user_id, query.into()).await?))
}

/// GET /api/booking/{id}
pub async fn get<S: BookingStore + 'static, C: InventoryClient + 'static>(
    State(state): State<Arc<BookingState<S, C>>>,
    CallerId(user_id): CallerId,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookingView>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.saga.get(BookingId::new(id), user_id).await?))
}

/// DELETE /api/booking/{id}: cancels and releases the room.
#[tracing::instrument(skip_all, fields(user_id = %caller.0, request_id = %correlation.0))]
pub async fn cancel<S: BookingStore + 'static, C: InventoryClient + 'static>(
    State(state): State<Arc<BookingState<S, C>>>,
    caller: CallerId,
    correlation: Correlation,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state
        .saga
        .cancel(BookingId::new(id), caller.0, correlation.0)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
