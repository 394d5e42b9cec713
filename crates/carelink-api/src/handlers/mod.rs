//! HTTP request handlers.

pub mod dashboard;
pub mod device;
pub mod events;
pub mod rpc;
