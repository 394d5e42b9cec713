//! # carelink-bus
//!
//! Broker seams for the notification pipeline. The pub/sub bus and the
//! log-structured broker are given infrastructure; this crate defines
//! the traits the pipeline components program against and provides a
//! Redis-backed implementation (channels for the bus, streams for the
//! log) plus an in-memory one for tests and single-node runs.
//!
//! The in-process [`hub::EventHub`] lets same-process listeners (the
//! dashboard SSE stream) react to consumed events without a second
//! network round trip.

pub mod hub;
pub mod memory;
pub mod redis_broker;
pub mod traits;

pub use hub::EventHub;
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;
pub use traits::{BusMessage, BusSubscription, EventBus, StreamProducer};
