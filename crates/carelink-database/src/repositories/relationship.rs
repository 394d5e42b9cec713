//! Relationship repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use carelink_core::error::{AppError, ErrorKind};
use carelink_core::result::AppResult;
use carelink_entity::relationship::Relationship;

/// Read-only repository over the CRUD-owned relationship table.
#[derive(Debug, Clone)]
pub struct RelationshipRepository {
    pool: PgPool,
}

impl RelationshipRepository {
    /// Create a new relationship repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Caregivers linked to a monitored senior.
    pub async fn find_caregivers(&self, senior_id: Uuid) -> AppResult<Vec<Relationship>> {
        sqlx::query_as::<_, Relationship>(
            "SELECT * FROM relationships WHERE senior_id = $1 ORDER BY id ASC",
        )
        .bind(senior_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list caregivers", e))
    }
}
