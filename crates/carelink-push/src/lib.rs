//! # carelink-push
//!
//! Push delivery subsystem. Resolves a user's device tokens, formats
//! the notification payload, sends through the primary gateway protocol
//! with an HTTP v1 fallback, and revokes tokens the gateway confirms
//! permanently invalid. Individual token failures are isolated: one bad
//! token never aborts delivery to the user's other devices.

pub mod formatter;
pub mod gateway;
pub mod service;
pub mod store;

pub use gateway::{FcmGateway, GatewayError, PushGateway, PushMessage};
pub use service::PushService;
pub use store::TokenStore;
