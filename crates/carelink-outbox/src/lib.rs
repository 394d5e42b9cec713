//! # carelink-outbox
//!
//! The delivery guarantee boundary of the pipeline. Producers call
//! [`OutboxService::enqueue`] and get "durably queued" synchronously;
//! the [`OutboxPublisher`] loop moves rows onto the log-structured
//! broker eventually, with linear backoff and a dead-letter path for
//! poison events.

pub mod publisher;
pub mod service;

pub use publisher::OutboxPublisher;
pub use service::OutboxService;
