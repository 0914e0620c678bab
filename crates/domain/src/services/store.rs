//! Relationship store seam.
//!
//! The link state machine and the fanout channel talk to storage through the
//! narrow [`LinkStore`] trait so they can be tested against the in-memory
//! implementation below. The production implementation lives in the
//! persistence crate and maps these calls onto PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    AccountRole, AccountSummary, AlertEvent, LinkRequest, LinkRequestState, LinkToken,
    LocationSample, Relationship,
};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditional insert hit an existing row (e.g. Postgres 23505).
    /// Callers treat this as a recoverable "already exists" signal.
    #[error("Record already exists")]
    Duplicate,

    /// The store is unreachable or the query failed; safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage operations consumed by the link state machine, the authorization
/// gate, and the fanout channel.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Look up an account's public summary.
    async fn account_summary(&self, user_id: Uuid) -> Result<Option<AccountSummary>, StoreError>;

    /// Activate `token` for its parent, replacing any previously active
    /// token in the same write.
    async fn put_active_token(&self, token: LinkToken) -> Result<(), StoreError>;

    /// Find the active token matching `code`, expired or not.
    async fn find_active_token(&self, code: &str) -> Result<Option<LinkToken>, StoreError>;

    /// Deactivate the parent's active token.
    async fn consume_token(&self, parent_id: Uuid) -> Result<(), StoreError>;

    /// Find the pending request for a (child, parent) pair, if any.
    async fn find_pending_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError>;

    /// Find any pending request made by `child_id`.
    async fn find_pending_for_child(
        &self,
        child_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError>;

    /// All pending requests addressed to `parent_id`, oldest first.
    async fn list_pending_requests(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<LinkRequest>, StoreError>;

    /// Create a pending request. Fails with [`StoreError::Duplicate`] when
    /// one already exists for the pair.
    async fn create_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<LinkRequest, StoreError>;

    /// Resolve a pending request to `outcome`. Returns `None` when the
    /// request does not exist or is no longer pending.
    async fn resolve_request(
        &self,
        id: Uuid,
        outcome: LinkRequestState,
    ) -> Result<Option<LinkRequest>, StoreError>;

    /// Create a relationship. Fails with [`StoreError::Duplicate`] when the
    /// child is already linked.
    async fn create_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<Relationship, StoreError>;

    /// Delete a relationship. Returns whether a row was removed.
    async fn delete_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// All relationships where `parent_id` is the guardian.
    async fn list_children_of(&self, parent_id: Uuid) -> Result<Vec<Relationship>, StoreError>;

    /// The relationship `child_id` belongs to, if any.
    async fn find_parent_of(&self, child_id: Uuid) -> Result<Option<Relationship>, StoreError>;

    /// Resolve pending requests created before `cutoff` to `expired`.
    /// Returns the number of requests transitioned.
    async fn expire_pending_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Location samples for the given users captured at or after `since`,
    /// oldest first. Used by the fanout catch-up poll.
    async fn list_locations_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, StoreError>;

    /// Alerts for the given users created at or after `since`, oldest first.
    async fn list_alerts_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<AlertEvent>, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, AccountSummary>,
    /// Active tokens keyed by parent id: one per parent by construction.
    tokens: HashMap<Uuid, LinkToken>,
    requests: Vec<LinkRequest>,
    relationships: Vec<Relationship>,
    locations: Vec<LocationSample>,
    alerts: Vec<AlertEvent>,
}

/// In-memory store for tests and development.
///
/// Mirrors the conditional-write behavior of the PostgreSQL implementation:
/// activating a token replaces the previous one, duplicate pending requests
/// and relationships are rejected with [`StoreError::Duplicate`].
#[derive(Default)]
pub struct MemoryLinkStore {
    state: Mutex<MemoryState>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account, as the identity provider would at sign-up.
    pub async fn register_account(&self, id: Uuid, role: AccountRole, display_name: &str) {
        let mut state = self.state.lock().await;
        state.accounts.insert(
            id,
            AccountSummary {
                id,
                role,
                display_name: display_name.to_string(),
                email: Some(format!("{}@example.com", display_name.to_lowercase())),
            },
        );
    }

    /// Insert a location sample directly, as the ingestion path would.
    pub async fn insert_location(&self, sample: LocationSample) {
        self.state.lock().await.locations.push(sample);
    }

    /// Insert an alert directly, as the ingestion path would.
    pub async fn insert_alert(&self, alert: AlertEvent) {
        self.state.lock().await.alerts.push(alert);
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn account_summary(&self, user_id: Uuid) -> Result<Option<AccountSummary>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&user_id).cloned())
    }

    async fn put_active_token(&self, token: LinkToken) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.tokens.insert(token.parent_id, token);
        Ok(())
    }

    async fn find_active_token(&self, code: &str) -> Result<Option<LinkToken>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tokens.values().find(|t| t.code == code).cloned())
    }

    async fn consume_token(&self, parent_id: Uuid) -> Result<(), StoreError> {
        self.state.lock().await.tokens.remove(&parent_id);
        Ok(())
    }

    async fn find_pending_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .find(|r| {
                r.child_id == child_id
                    && r.parent_id == parent_id
                    && r.state == LinkRequestState::Pending
            })
            .cloned())
    }

    async fn find_pending_for_child(
        &self,
        child_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .find(|r| r.child_id == child_id && r.state == LinkRequestState::Pending)
            .cloned())
    }

    async fn list_pending_requests(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<LinkRequest>, StoreError> {
        let state = self.state.lock().await;
        let mut pending: Vec<LinkRequest> = state
            .requests
            .iter()
            .filter(|r| r.parent_id == parent_id && r.state == LinkRequestState::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn create_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<LinkRequest, StoreError> {
        let mut state = self.state.lock().await;
        let duplicate = state.requests.iter().any(|r| {
            r.child_id == child_id
                && r.parent_id == parent_id
                && r.state == LinkRequestState::Pending
        });
        if duplicate {
            return Err(StoreError::Duplicate);
        }
        let request = LinkRequest {
            id: Uuid::new_v4(),
            child_id,
            parent_id,
            state: LinkRequestState::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn resolve_request(
        &self,
        id: Uuid,
        outcome: LinkRequestState,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let mut state = self.state.lock().await;
        match state
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.state == LinkRequestState::Pending)
        {
            Some(request) => {
                request.state = outcome;
                request.resolved_at = Some(Utc::now());
                Ok(Some(request.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<Relationship, StoreError> {
        let mut state = self.state.lock().await;
        if state.relationships.iter().any(|r| r.child_id == child_id) {
            return Err(StoreError::Duplicate);
        }
        let relationship = Relationship {
            parent_id,
            child_id,
            linked_at: Utc::now(),
        };
        state.relationships.push(relationship.clone());
        Ok(relationship)
    }

    async fn delete_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.relationships.len();
        state
            .relationships
            .retain(|r| !(r.parent_id == parent_id && r.child_id == child_id));
        Ok(state.relationships.len() < before)
    }

    async fn list_children_of(&self, parent_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .relationships
            .iter()
            .filter(|r| r.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn find_parent_of(&self, child_id: Uuid) -> Result<Option<Relationship>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .relationships
            .iter()
            .find(|r| r.child_id == child_id)
            .cloned())
    }

    async fn expire_pending_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut expired = 0u64;
        for request in state
            .requests
            .iter_mut()
            .filter(|r| r.state == LinkRequestState::Pending && r.created_at < cutoff)
        {
            request.state = LinkRequestState::Expired;
            request.resolved_at = Some(now);
            expired += 1;
        }
        Ok(expired)
    }

    async fn list_locations_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, StoreError> {
        let state = self.state.lock().await;
        let mut samples: Vec<LocationSample> = state
            .locations
            .iter()
            .filter(|s| user_ids.contains(&s.user_id) && s.recorded_at >= since)
            .cloned()
            .collect();
        samples.sort_by_key(|s| s.recorded_at);
        Ok(samples)
    }

    async fn list_alerts_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<AlertEvent>, StoreError> {
        let state = self.state.lock().await;
        let mut alerts: Vec<AlertEvent> = state
            .alerts
            .iter()
            .filter(|a| user_ids.contains(&a.user_id) && a.created_at >= since)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.created_at);
        Ok(alerts)
    }
}
