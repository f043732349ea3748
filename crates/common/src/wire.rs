//! JSON shapes exchanged between the booking and inventory services.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BookingUid, HotelId, RequestId, RoomId};

/// Body of `POST /api/rooms/{id}/confirm-availability`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAvailabilityRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub booking_id: BookingUid,
    pub request_id: RequestId,
}

/// A room as exposed by the inventory's read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub number: String,
    pub available: bool,
    #[serde(default)]
    pub times_booked: i64,
}
