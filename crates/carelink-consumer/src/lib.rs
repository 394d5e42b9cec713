//! # carelink-consumer
//!
//! The pub/sub bus consumer. Subscribes to the fixed pipeline topics at
//! quality-of-service "at least once", decodes each message, collapses
//! redeliveries through the dedup gate, translates gamification events,
//! persists the audit record, and fans the event out to the in-process
//! hub and the push subsystem.

pub mod consumer;
pub mod decode;

pub use consumer::BusConsumer;
