//! Booking ledger and the saga that books rooms against a remote inventory.
//!
//! A booking is created in three steps:
//! 1. Claim the request id ([`IdempotencyGuard`])
//! 2. Persist the booking as PENDING
//! 3. Confirm the room through an [`InventoryClient`]
//!
//! If the confirmation fails the booking is marked CANCELLED and the room
//! lock is released on a best-effort basis.

pub mod client;
pub mod error;
pub mod idempotency;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod saga;
pub mod store;

pub use client::{
    ClientError, HttpInventoryClient, HttpInventoryClientConfig, InventoryCalls, InventoryClient,
    LocalInventoryClient, RetryPolicy,
};
pub use error::{BookingError, Result};
pub use idempotency::IdempotencyGuard;
pub use memory::InMemoryBookingStore;
pub use model::{
    Booking, BookingStatus, BookingView, CreateBooking, NewBooking, Page, PageRequest,
};
pub use postgres::PostgresBookingStore;
pub use saga::BookingSaga;
pub use store::BookingStore;
