//! Outbox repository implementation.
//!
//! The outbox table is the delivery guarantee boundary: rows are the
//! unit of truly durable state, mutated only by the publisher, never
//! deleted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::outbox::OutboxEvent;

/// Repository for outbox rows.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    /// Create a new outbox repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Durably append an event. Returns the stored row.
    pub async fn insert(
        &self,
        id: Uuid,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> AppResult<OutboxEvent> {
        sqlx::query_as::<_, OutboxEvent>(
            "INSERT INTO outbox_events (id, event_type, payload) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(id)
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append outbox event", e))
    }

    /// Claim up to `batch_size` due rows for publishing.
    ///
    /// The claim pushes `next_attempt_at` forward by `lease_seconds`
    /// inside the same statement (SKIP LOCKED against concurrent
    /// replicas), so a crashed publisher's claims become visible again
    /// once the lease lapses. Retry state lives entirely in the row.
    pub async fn claim_due(&self, batch_size: i64, lease_seconds: i64) -> AppResult<Vec<OutboxEvent>> {
        sqlx::query_as::<_, OutboxEvent>(
            "UPDATE outbox_events SET next_attempt_at = NOW() + make_interval(secs => $2) \
             WHERE id IN ( \
                SELECT id FROM outbox_events \
                WHERE published = FALSE \
                AND (next_attempt_at IS NULL OR next_attempt_at <= NOW()) \
                ORDER BY created_at ASC \
                FOR UPDATE SKIP LOCKED \
                LIMIT $1 \
             ) RETURNING *",
        )
        .bind(batch_size)
        .bind(lease_seconds as f64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim outbox rows", e))
    }

    /// Mark a row as successfully published.
    pub async fn mark_published(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE outbox_events SET published = TRUE, published_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark published", e))?;
        Ok(())
    }

    /// Record a failed publish attempt and schedule the next one.
    pub async fn record_failure(
        &self,
        id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE outbox_events SET attempts = attempts + 1, last_error = $2, \
             next_attempt_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record failure", e))?;
        Ok(())
    }

    /// Mark a poison row terminal after dead-lettering.
    ///
    /// Terminal rows are flagged `published` so they never block the
    /// queue again; `published_at` stays NULL to distinguish them from
    /// genuinely published events.
    pub async fn mark_terminal(&self, id: Uuid, error: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE outbox_events SET published = TRUE, attempts = attempts + 1, \
             last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark terminal", e))?;
        Ok(())
    }

    /// Find a row by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<OutboxEvent>> {
        sqlx::query_as::<_, OutboxEvent>("SELECT * FROM outbox_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find outbox event", e))
    }

    /// Count rows still awaiting publication.
    pub async fn count_pending(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE published = FALSE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count pending", e))
    }
}
