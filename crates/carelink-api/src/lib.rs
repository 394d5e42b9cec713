//! # carelink-api
//!
//! HTTP layer for CareLink built on Axum.
//!
//! Exposes the synchronous RPC facade (event publication and read-only
//! lookups), the ingestion endpoints the CRUD layer calls to feed the
//! pipeline, and the dashboard stream/history views.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
