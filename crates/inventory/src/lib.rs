//! Room inventory side of the booking saga.
//!
//! The [`RoomLockManager`] owns rooms and room locks. It serializes every
//! confirm/release against the same room through a per-room hold, keeps
//! locks for one room overlap-free, and treats a repeated request id as a
//! no-op rather than a second lock.

pub mod error;
pub mod hold;
pub mod manager;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod seed;
pub mod store;

pub use common::{BookingUid, DateRange, HotelId, RequestId, RoomId, RoomView};
pub use error::{InventoryError, Result};
pub use hold::RoomHolds;
pub use manager::{ConfirmOutcome, ReleaseOutcome, RoomLockManager};
pub use memory::InMemoryRoomStore;
pub use model::{NewRoom, NewRoomLock, Room, RoomLock};
pub use postgres::PostgresRoomStore;
pub use seed::seed_demo_rooms;
pub use store::RoomStore;
