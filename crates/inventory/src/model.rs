//! Rooms and room locks.

use chrono::{DateTime, Utc};
use common::{BookingUid, DateRange, HotelId, RequestId, RoomId, RoomView};
use serde::{Deserialize, Serialize};

/// A bookable room.
///
/// `times_booked` is a fairness hint for recommendations: it goes up when a
/// lock is created and down (never below zero) when one is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub number: String,
    pub operational: bool,
    pub times_booked: i64,
}

impl Room {
    pub fn view(&self) -> RoomView {
        RoomView {
            id: self.id,
            hotel_id: self.hotel_id,
            number: self.number.clone(),
            available: self.operational,
            times_booked: self.times_booked,
        }
    }
}

/// A room to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub hotel_id: HotelId,
    pub number: String,
    pub operational: bool,
}

impl NewRoom {
    /// An operational room with no booking history.
    pub fn new(hotel_id: HotelId, number: impl Into<String>) -> Self {
        Self {
            hotel_id,
            number: number.into(),
            operational: true,
        }
    }

    /// Marks the room as out of service.
    pub fn out_of_service(mut self) -> Self {
        self.operational = false;
        self
    }
}

/// Exclusive hold on a room for a period.
///
/// Both `booking_uid` and `request_id` are unique across all locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLock {
    pub id: i64,
    pub room_id: RoomId,
    pub range: DateRange,
    pub booking_uid: BookingUid,
    pub request_id: RequestId,
    pub created_at: DateTime<Utc>,
}

/// A lock to be inserted.
#[derive(Debug, Clone)]
pub struct NewRoomLock {
    pub room_id: RoomId,
    pub range: DateRange,
    pub booking_uid: BookingUid,
    pub request_id: RequestId,
}
