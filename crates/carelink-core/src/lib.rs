//! # carelink-core
//!
//! Core crate for the CareLink notification pipeline. Contains
//! configuration schemas, the domain event envelope, pipeline counters,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other CareLink crates.

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
