//! Senior/caregiver relationship model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Link between a monitored senior and a caregiver account.
///
/// Owned by the CRUD domain; read-only from the pipeline's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Relationship {
    /// Row identifier.
    pub id: Uuid,
    /// The monitored senior.
    pub senior_id: Uuid,
    /// The linked caregiver account.
    pub link_acc_id: Uuid,
    /// Relation label (`"daughter"`, `"nurse"`, ...).
    pub relation: String,
}
