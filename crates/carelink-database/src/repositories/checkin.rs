//! Check-in repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::checkin::CheckIn;

/// Repository for the append-only check-in table.
#[derive(Debug, Clone)]
pub struct CheckInRepository {
    pool: PgPool,
}

impl CheckInRepository {
    /// Create a new check-in repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a check-in.
    pub async fn insert(&self, user_id: Uuid, mood: &str) -> AppResult<CheckIn> {
        sqlx::query_as::<_, CheckIn>(
            "INSERT INTO check_ins (user_id, mood) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(mood)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert check-in", e))
    }

    /// Recent check-ins for a user, newest first.
    pub async fn find_recent_by_user(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<CheckIn>> {
        sqlx::query_as::<_, CheckIn>(
            "SELECT * FROM check_ins WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list check-ins", e))
    }

    /// Whether the user has checked in at or after `since`.
    pub async fn exists_since(&self, user_id: Uuid, since: DateTime<Utc>) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM check_ins WHERE user_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check check-ins", e))?;
        Ok(count > 0)
    }
}
