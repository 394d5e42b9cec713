//! Deduplication gate repository.

use sqlx::PgPool;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;

/// Repository backing the deduplication gate.
///
/// Correctness under concurrent consumer replicas rests on the
/// primary-key constraint of `processed_messages`: the claim is a single
/// atomic insert, never a read followed by a write.
#[derive(Debug, Clone)]
pub struct ProcessedMessageRepository {
    pool: PgPool,
}

impl ProcessedMessageRepository {
    /// Create a new dedup repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attempt to claim a message ID.
    ///
    /// Returns `true` for the first claimer. A conflicting insert is the
    /// dedup signal, surfaced as `rows_affected == 0` by
    /// `ON CONFLICT DO NOTHING`. Every other database error still
    /// propagates as `Err`, so the two cases cannot be confused.
    pub async fn claim(&self, message_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO processed_messages (message_id, processed_at) VALUES ($1, NOW()) \
             ON CONFLICT (message_id) DO NOTHING",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim message", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Whether a message ID has already been claimed. Diagnostic only,
    /// never a substitute for [`claim`](Self::claim).
    pub async fn is_processed(&self, message_id: &str) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM processed_messages WHERE message_id = $1")
                .bind(message_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to check message", e)
                })?;
        Ok(count > 0)
    }
}
