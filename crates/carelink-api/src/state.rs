//! Application state shared across all handlers.

use std::sync::Arc;

use carelink_bus::EventHub;
use carelink_core::config::AppConfig;
use carelink_core::metrics::PipelineCounters;
use carelink_database::repositories::checkin::CheckInRepository;
use carelink_database::repositories::device_token::DeviceTokenRepository;
use carelink_database::repositories::notification_event::NotificationEventRepository;
use carelink_database::repositories::user::UserRepository;
use carelink_database::DatabasePool;
use carelink_outbox::OutboxService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped (or internally pooled) for cheap
/// cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db: DatabasePool,
    /// Outbox append service.
    pub outbox: OutboxService,
    /// In-process event hub feeding the dashboard stream.
    pub hub: EventHub,
    /// Pipeline counters exposed on the health endpoint.
    pub counters: Arc<PipelineCounters>,

    /// User projection repository.
    pub user_repo: Arc<UserRepository>,
    /// Check-in repository.
    pub checkin_repo: Arc<CheckInRepository>,
    /// Device token repository.
    pub token_repo: Arc<DeviceTokenRepository>,
    /// Received-event audit repository.
    pub event_repo: Arc<NotificationEventRepository>,
}
