//! Relationship domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A durable parent-child association.
///
/// Created only by approving a link request; a child belongs to at most one
/// parent at a time. Deleting the relationship revokes the child from the
/// parent's event fanout before the next delivered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Relationship {
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub linked_at: DateTime<Utc>,
}

/// A linked child as listed to its parent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkedChildSummary {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub linked_at: DateTime<Utc>,
}
