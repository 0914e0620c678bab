//! Relationship entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Relationship;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the relationships table.
#[derive(Debug, Clone, FromRow)]
pub struct RelationshipEntity {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub linked_at: DateTime<Utc>,
}

impl From<RelationshipEntity> for Relationship {
    fn from(entity: RelationshipEntity) -> Self {
        Self {
            parent_id: entity.parent_id,
            child_id: entity.child_id,
            linked_at: entity.linked_at,
        }
    }
}
