//! Shared types for the hotel booking services.
//!
//! Both the booking ledger and the room inventory depend on this crate for
//! identifiers, the half-open [`DateRange`], the [`ErrorKind`] taxonomy and
//! the JSON shapes exchanged between the two services.

pub mod error;
pub mod types;
pub mod wire;

pub use error::{ErrorBody, ErrorKind};
pub use types::{BookingId, BookingUid, DateRange, HotelId, InvalidDateRange, RequestId, RoomId, UserId};
pub use wire::{ConfirmAvailabilityRequest, RoomView};

/// Header carrying the end-to-end correlation identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the caller identity resolved by the edge.
pub const USER_ID_HEADER: &str = "x-user-id";
