//! Concrete repository implementations, one per table.

pub mod checkin;
pub mod device_token;
pub mod notification_event;
pub mod outbox;
pub mod processed_message;
pub mod relationship;
pub mod user;
