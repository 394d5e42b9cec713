//! # carelink-entity
//!
//! Entity models for every table the notification pipeline touches,
//! plus the delivery-report value types returned by push delivery.

pub mod checkin;
pub mod delivery;
pub mod device_token;
pub mod notification_event;
pub mod outbox;
pub mod processed_message;
pub mod relationship;
pub mod user;

pub use checkin::CheckIn;
pub use delivery::{DeliveryReport, TokenDelivery, TokenOutcome};
pub use device_token::DeviceToken;
pub use notification_event::NotificationEvent;
pub use outbox::{EventRef, OutboxEvent};
pub use processed_message::ProcessedMessage;
pub use relationship::Relationship;
pub use user::User;
