//! Link-request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{LinkRequest, LinkRequestState};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for link_request_state that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "link_request_state", rename_all = "lowercase")]
pub enum LinkRequestStateDb {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl From<LinkRequestStateDb> for LinkRequestState {
    fn from(db_state: LinkRequestStateDb) -> Self {
        match db_state {
            LinkRequestStateDb::Pending => LinkRequestState::Pending,
            LinkRequestStateDb::Approved => LinkRequestState::Approved,
            LinkRequestStateDb::Rejected => LinkRequestState::Rejected,
            LinkRequestStateDb::Expired => LinkRequestState::Expired,
        }
    }
}

impl From<LinkRequestState> for LinkRequestStateDb {
    fn from(state: LinkRequestState) -> Self {
        match state {
            LinkRequestState::Pending => LinkRequestStateDb::Pending,
            LinkRequestState::Approved => LinkRequestStateDb::Approved,
            LinkRequestState::Rejected => LinkRequestStateDb::Rejected,
            LinkRequestState::Expired => LinkRequestStateDb::Expired,
        }
    }
}

/// Database row mapping for the link_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct LinkRequestEntity {
    pub id: Uuid,
    pub child_id: Uuid,
    pub parent_id: Uuid,
    pub state: LinkRequestStateDb,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<LinkRequestEntity> for LinkRequest {
    fn from(entity: LinkRequestEntity) -> Self {
        Self {
            id: entity.id,
            child_id: entity.child_id,
            parent_id: entity.parent_id,
            state: entity.state.into(),
            created_at: entity.created_at,
            resolved_at: entity.resolved_at,
        }
    }
}
