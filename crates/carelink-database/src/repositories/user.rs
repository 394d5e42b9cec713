//! User projection repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::user::User;

/// Repository for the local user projection.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    /// All monitored users, in stable order for the sweep.
    pub async fn find_all(&self) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY user_id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))
    }

    /// Insert or refresh a user projection row.
    pub async fn upsert(&self, user_id: Uuid, name: &str, email: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (user_id, name, email) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email \
             RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert user", e))
    }

    /// Advance the user's last check-in time.
    pub async fn record_check_in(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_check_in_at = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to record check-in", e))?;
        Ok(())
    }

    /// Claim the daily reminder slot for a user.
    ///
    /// Compare-and-set on `last_reminder_at`: succeeds at most once per
    /// day per user even when sweeps race across replicas. `true` means
    /// the caller owns today's reminder and must emit the alerts.
    pub async fn claim_reminder(
        &self,
        user_id: Uuid,
        today_start: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET last_reminder_at = NOW() \
             WHERE user_id = $1 AND (last_reminder_at IS NULL OR last_reminder_at < $2)",
        )
        .bind(user_id)
        .bind(today_start)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim reminder", e))?;
        Ok(result.rows_affected() == 1)
    }
}
