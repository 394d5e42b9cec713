//! Received-event audit repository.

use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::notification_event::NotificationEvent;

/// Repository for the received-event audit table.
#[derive(Debug, Clone)]
pub struct NotificationEventRepository {
    pool: PgPool,
}

impl NotificationEventRepository {
    /// Create a new notification-event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist an inbound event.
    pub async fn insert(
        &self,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
        source_topic: &str,
    ) -> AppResult<NotificationEvent> {
        sqlx::query_as::<_, NotificationEvent>(
            "INSERT INTO notification_events (event_id, event_type, payload, source_topic) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .bind(source_topic)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to persist notification event", e)
        })
    }

    /// List events newest-first for the dashboard history view.
    pub async fn find_recent(&self, limit: i64, offset: i64) -> AppResult<Vec<NotificationEvent>> {
        sqlx::query_as::<_, NotificationEvent>(
            "SELECT * FROM notification_events ORDER BY received_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list events", e))
    }

    /// Total event count, for history pagination.
    pub async fn count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notification_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count events", e))
    }

    /// Append a user to an event's read set. Idempotent.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notification_events SET read_by = array_append(read_by, $2) \
             WHERE id = $1 AND NOT (read_by @> ARRAY[$2])",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark event read", e))?;
        Ok(result.rows_affected() == 1)
    }
}
