//! Pairing-token entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::LinkToken;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the link_tokens table.
///
/// One row per parent: activating a new token upserts the row, which is what
/// keeps "at most one active code per parent" atomic.
#[derive(Debug, Clone, FromRow)]
pub struct LinkTokenEntity {
    pub parent_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<LinkTokenEntity> for LinkToken {
    fn from(entity: LinkTokenEntity) -> Self {
        Self {
            parent_id: entity.parent_id,
            code: entity.code,
            issued_at: entity.issued_at,
            expires_at: entity.expires_at,
        }
    }
}
