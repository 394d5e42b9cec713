//! Device token repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::device_token::DeviceToken;

/// Repository for device push tokens.
#[derive(Debug, Clone)]
pub struct DeviceTokenRepository {
    pool: PgPool,
}

impl DeviceTokenRepository {
    /// Create a new device token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register or refresh a token. Re-registering a previously revoked
    /// token un-revokes it: the device has proven itself alive again.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        platform: &str,
    ) -> AppResult<DeviceToken> {
        sqlx::query_as::<_, DeviceToken>(
            "INSERT INTO device_tokens (user_id, token, platform) VALUES ($1, $2, $3) \
             ON CONFLICT (token) DO UPDATE SET user_id = EXCLUDED.user_id, \
             platform = EXCLUDED.platform, last_seen_at = NOW(), revoked = FALSE \
             RETURNING *",
        )
        .bind(user_id)
        .bind(token)
        .bind(platform)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert token", e))
    }

    /// All tokens for a user, revoked ones included.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<DeviceToken>> {
        sqlx::query_as::<_, DeviceToken>(
            "SELECT * FROM device_tokens WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list tokens", e))
    }

    /// Non-revoked tokens for a user, the push delivery candidates.
    pub async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<DeviceToken>> {
        sqlx::query_as::<_, DeviceToken>(
            "SELECT * FROM device_tokens WHERE user_id = $1 AND revoked = FALSE \
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list active tokens", e))
    }

    /// Record a delivery attempt against a token.
    pub async fn touch(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE device_tokens SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to touch token", e))?;
        Ok(())
    }

    /// Flag a token permanently invalid. The row is retained for audit.
    pub async fn revoke(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE device_tokens SET revoked = TRUE, last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to revoke token", e))?;
        Ok(())
    }
}
