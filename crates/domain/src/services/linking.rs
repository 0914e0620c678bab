//! Link state machine.
//!
//! Governs the lifecycle of a parent-child association:
//! unlinked -> pending -> linked, with rejection and expiry paths. All
//! multi-writer hazards (one active token per parent, one pending request
//! per pair) are enforced by conditional store writes, not by locks held
//! here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    AccountRole, ChildLinkStatusResponse, LinkRequest, LinkRequestState, LinkStatus, LinkToken,
    LinkedChildSummary, ParentSummary, PendingRequestSummary, RedeemOutcome, Relationship,
};
use crate::services::authorization::{Actor, AuthAction, AuthError, AuthorizationGate};
use crate::services::store::{LinkStore, StoreError};

/// Error type for linking operations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The code is malformed; rejected before any store access.
    #[error("Malformed pairing code")]
    MalformedCode,

    /// No active token matches the code.
    #[error("Invalid pairing code")]
    InvalidCode,

    /// The token matched but its lifetime has elapsed.
    #[error("Pairing code has expired")]
    ExpiredCode,

    /// A pending request already exists for this (child, parent) pair.
    #[error("A link request is already pending for this guardian")]
    AlreadyPending,

    /// The child is already linked to the issuing guardian.
    #[error("Already linked to this guardian")]
    AlreadyLinked,

    /// The child is linked to a different guardian.
    #[error("Already linked to another guardian")]
    AlreadyLinkedElsewhere,

    /// No matching token, request, or relationship.
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The link state machine over a [`LinkStore`].
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn LinkStore>,
    gate: AuthorizationGate,
}

impl LinkService {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        let gate = AuthorizationGate::new(store.clone());
        Self { store, gate }
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> {
        &self.store
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    /// Issue a fresh pairing code for the calling parent.
    ///
    /// Any previously active code is invalidated by the same store write, so
    /// two codes are never simultaneously valid for one parent.
    pub async fn generate_code(&self, actor: &Actor) -> Result<LinkToken, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let token = LinkToken::issue(actor.id, Utc::now());
        self.store.put_active_token(token.clone()).await?;

        info!(
            parent_id = %actor.id,
            expires_at = %token.expires_at,
            "Pairing code issued"
        );

        Ok(token)
    }

    /// Redeem a pairing code on behalf of the calling child.
    ///
    /// The token is consumed by this attempt regardless of outcome, so a
    /// code cannot be probed twice. On success the pending request is
    /// created and the parent's display name returned for UI confirmation.
    pub async fn redeem_code(&self, actor: &Actor, code: &str) -> Result<RedeemOutcome, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Child,
                },
            )
            .await?;

        if shared::validation::validate_link_code(code).is_err() {
            return Err(LinkError::MalformedCode);
        }

        let token = self
            .store
            .find_active_token(code)
            .await?
            .ok_or(LinkError::InvalidCode)?;

        // Single-use: consumed on the first attempt, successful or not
        self.store.consume_token(token.parent_id).await?;

        if token.is_expired(Utc::now()) {
            return Err(LinkError::ExpiredCode);
        }

        if self
            .store
            .find_pending_request(actor.id, token.parent_id)
            .await?
            .is_some()
        {
            return Err(LinkError::AlreadyPending);
        }

        if let Some(relationship) = self.store.find_parent_of(actor.id).await? {
            return Err(if relationship.parent_id == token.parent_id {
                LinkError::AlreadyLinked
            } else {
                LinkError::AlreadyLinkedElsewhere
            });
        }

        let request = match self.store.create_request(actor.id, token.parent_id).await {
            Ok(request) => request,
            // A concurrent redeem won the conditional insert
            Err(StoreError::Duplicate) => return Err(LinkError::AlreadyPending),
            Err(e) => return Err(e.into()),
        };

        let parent = self
            .store
            .account_summary(token.parent_id)
            .await?
            .ok_or(LinkError::NotFound)?;

        info!(
            child_id = %actor.id,
            parent_id = %token.parent_id,
            request_id = %request.id,
            "Link request created"
        );

        Ok(RedeemOutcome {
            request,
            parent_display_name: parent.display_name,
        })
    }

    /// Approve a pending request from `child_id`, creating the relationship.
    ///
    /// Idempotent on retry: approving an already-approved link returns the
    /// existing relationship instead of failing, so a client that lost the
    /// response can safely resend.
    pub async fn approve(&self, actor: &Actor, child_id: Uuid) -> Result<Relationship, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let pending = self.store.find_pending_request(child_id, actor.id).await?;

        let Some(request) = pending else {
            // Retry after a dropped response: the relationship may already exist
            return match self.store.find_parent_of(child_id).await? {
                Some(relationship) if relationship.parent_id == actor.id => Ok(relationship),
                _ => Err(LinkError::NotFound),
            };
        };

        self.store
            .resolve_request(request.id, LinkRequestState::Approved)
            .await?;

        let relationship = match self.store.create_relationship(actor.id, child_id).await {
            Ok(relationship) => relationship,
            // Already created by an earlier attempt; re-runnable by design
            Err(StoreError::Duplicate) => self
                .store
                .find_parent_of(child_id)
                .await?
                .filter(|r| r.parent_id == actor.id)
                .ok_or(LinkError::AlreadyLinkedElsewhere)?,
            Err(e) => return Err(e.into()),
        };

        info!(
            parent_id = %actor.id,
            child_id = %child_id,
            "Link approved"
        );

        Ok(relationship)
    }

    /// Reject a pending request from `child_id`. The child may redeem a
    /// fresh code afterward.
    pub async fn reject(&self, actor: &Actor, child_id: Uuid) -> Result<LinkRequest, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let request = self
            .store
            .find_pending_request(child_id, actor.id)
            .await?
            .ok_or(LinkError::NotFound)?;

        let rejected = self
            .store
            .resolve_request(request.id, LinkRequestState::Rejected)
            .await?
            .ok_or(LinkError::NotFound)?;

        info!(
            parent_id = %actor.id,
            child_id = %child_id,
            "Link rejected"
        );

        Ok(rejected)
    }

    /// Remove the relationship with `child_id`. The fanout channel stops
    /// delivering the child's events at the next delivery boundary because
    /// its filter reads the same store this writes.
    pub async fn unlink(&self, actor: &Actor, child_id: Uuid) -> Result<(), LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let removed = self.store.delete_relationship(actor.id, child_id).await?;
        if !removed {
            return Err(LinkError::NotFound);
        }

        info!(
            parent_id = %actor.id,
            child_id = %child_id,
            "Child unlinked"
        );

        Ok(())
    }

    /// Pending requests addressed to the calling parent, with child info.
    pub async fn pending_requests(
        &self,
        actor: &Actor,
    ) -> Result<Vec<PendingRequestSummary>, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let requests = self.store.list_pending_requests(actor.id).await?;
        let mut summaries = Vec::with_capacity(requests.len());
        for request in requests {
            let child = self
                .store
                .account_summary(request.child_id)
                .await?
                .ok_or(LinkError::NotFound)?;
            summaries.push(PendingRequestSummary {
                id: request.id,
                child_id: request.child_id,
                child_display_name: child.display_name,
                child_email: child.email,
                created_at: request.created_at,
            });
        }
        Ok(summaries)
    }

    /// Children linked to the calling parent.
    pub async fn linked_children(
        &self,
        actor: &Actor,
    ) -> Result<Vec<LinkedChildSummary>, LinkError> {
        self.gate
            .authorize(
                actor,
                actor.id,
                AuthAction::ManageLink {
                    as_role: AccountRole::Parent,
                },
            )
            .await?;

        let relationships = self.store.list_children_of(actor.id).await?;
        let mut children = Vec::with_capacity(relationships.len());
        for relationship in relationships {
            let child = self
                .store
                .account_summary(relationship.child_id)
                .await?
                .ok_or(LinkError::NotFound)?;
            children.push(LinkedChildSummary {
                id: child.id,
                display_name: child.display_name,
                email: child.email,
                linked_at: relationship.linked_at,
            });
        }
        Ok(children)
    }

    /// The calling child's own link status.
    pub async fn child_link_status(
        &self,
        actor: &Actor,
    ) -> Result<ChildLinkStatusResponse, LinkError> {
        self.gate
            .authorize(actor, actor.id, AuthAction::ReadOwn)
            .await?;

        if let Some(relationship) = self.store.find_parent_of(actor.id).await? {
            let parent = self.parent_summary(relationship.parent_id).await?;
            return Ok(ChildLinkStatusResponse {
                status: LinkStatus::Linked,
                parent: Some(parent),
            });
        }

        if let Some(request) = self.store.find_pending_for_child(actor.id).await? {
            let parent = self.parent_summary(request.parent_id).await?;
            return Ok(ChildLinkStatusResponse {
                status: LinkStatus::Pending,
                parent: Some(parent),
            });
        }

        Ok(ChildLinkStatusResponse {
            status: LinkStatus::None,
            parent: None,
        })
    }

    /// Resolve pending requests older than `ttl` to `expired`. Driven by the
    /// background sweeper; returns the number of requests transitioned.
    pub async fn expire_stale_requests(&self, ttl: chrono::Duration) -> Result<u64, LinkError> {
        let cutoff: DateTime<Utc> = Utc::now() - ttl;
        let expired = self.store.expire_pending_before(cutoff).await?;
        if expired > 0 {
            info!(count = expired, "Expired stale link requests");
        }
        Ok(expired)
    }

    async fn parent_summary(&self, parent_id: Uuid) -> Result<ParentSummary, LinkError> {
        let parent = self
            .store
            .account_summary(parent_id)
            .await?
            .ok_or(LinkError::NotFound)?;
        Ok(ParentSummary {
            id: parent.id,
            display_name: parent.display_name,
            email: parent.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryLinkStore;
    use fake::faker::name::en::Name;
    use fake::Fake;

    struct Fixture {
        service: LinkService,
        store: Arc<MemoryLinkStore>,
        parent: Actor,
        child: Actor,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryLinkStore::new());
        let parent = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        let child = Actor::new(Uuid::new_v4(), AccountRole::Child);
        let parent_name: String = Name().fake();
        let child_name: String = Name().fake();
        store
            .register_account(parent.id, AccountRole::Parent, &parent_name)
            .await;
        store
            .register_account(child.id, AccountRole::Child, &child_name)
            .await;
        Fixture {
            service: LinkService::new(store.clone()),
            store,
            parent,
            child,
        }
    }

    #[tokio::test]
    async fn test_generate_requires_parent_role() {
        let f = fixture().await;
        let result = f.service.generate_code(&f.child).await;
        assert!(matches!(
            result,
            Err(LinkError::Auth(AuthError::RoleViolation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_generate_invalidates_previous_code() {
        let f = fixture().await;
        let first = f.service.generate_code(&f.parent).await.unwrap();
        let second = f.service.generate_code(&f.parent).await.unwrap();

        // The first code no longer matches any active token
        let result = f.service.redeem_code(&f.child, &first.code).await;
        assert!(matches!(result, Err(LinkError::InvalidCode)));

        // The second one works
        let outcome = f.service.redeem_code(&f.child, &second.code).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_redeem_malformed_code_fails_before_store() {
        let f = fixture().await;
        let result = f.service.redeem_code(&f.child, "bad!").await;
        assert!(matches!(result, Err(LinkError::MalformedCode)));
    }

    #[tokio::test]
    async fn test_redeem_unknown_code() {
        let f = fixture().await;
        let result = f.service.redeem_code(&f.child, "A7K2M9").await;
        assert!(matches!(result, Err(LinkError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_redeem_requires_child_role() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        let result = f.service.redeem_code(&f.parent, &token.code).await;
        assert!(matches!(
            result,
            Err(LinkError::Auth(AuthError::RoleViolation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_redeem_creates_pending_and_returns_parent_name() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        let outcome = f.service.redeem_code(&f.child, &token.code).await.unwrap();

        assert_eq!(outcome.request.state, LinkRequestState::Pending);
        assert_eq!(outcome.request.child_id, f.child.id);
        assert_eq!(outcome.request.parent_id, f.parent.id);
        assert!(!outcome.parent_display_name.is_empty());
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        // A second child probing the same code finds nothing
        let other = Actor::new(Uuid::new_v4(), AccountRole::Child);
        f.store
            .register_account(other.id, AccountRole::Child, "Sam")
            .await;
        let result = f.service.redeem_code(&other, &token.code).await;
        assert!(matches!(result, Err(LinkError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_expired_code_consumed_and_reported() {
        let f = fixture().await;
        let now = Utc::now();
        let mut token = LinkToken::issue(f.parent.id, now);
        token.expires_at = now - chrono::Duration::minutes(1);
        let code = token.code.clone();
        f.store.put_active_token(token).await.unwrap();

        let result = f.service.redeem_code(&f.child, &code).await;
        assert!(matches!(result, Err(LinkError::ExpiredCode)));

        // The failed attempt still consumed the token
        let again = f.service.redeem_code(&f.child, &code).await;
        assert!(matches!(again, Err(LinkError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_second_redeem_while_pending() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        let token2 = f.service.generate_code(&f.parent).await.unwrap();
        let result = f.service.redeem_code(&f.child, &token2.code).await;
        assert!(matches!(result, Err(LinkError::AlreadyPending)));
    }

    #[tokio::test]
    async fn test_redeem_while_linked_elsewhere() {
        let f = fixture().await;
        let other_parent = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        f.store
            .register_account(other_parent.id, AccountRole::Parent, "Rival")
            .await;
        f.store
            .create_relationship(other_parent.id, f.child.id)
            .await
            .unwrap();

        let token = f.service.generate_code(&f.parent).await.unwrap();
        let result = f.service.redeem_code(&f.child, &token.code).await;
        assert!(matches!(result, Err(LinkError::AlreadyLinkedElsewhere)));
    }

    #[tokio::test]
    async fn test_redeem_while_linked_to_same_parent() {
        let f = fixture().await;
        f.store
            .create_relationship(f.parent.id, f.child.id)
            .await
            .unwrap();

        let token = f.service.generate_code(&f.parent).await.unwrap();
        let result = f.service.redeem_code(&f.child, &token.code).await;
        assert!(matches!(result, Err(LinkError::AlreadyLinked)));
    }

    #[tokio::test]
    async fn test_approve_creates_relationship() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        let relationship = f.service.approve(&f.parent, f.child.id).await.unwrap();
        assert_eq!(relationship.parent_id, f.parent.id);
        assert_eq!(relationship.child_id, f.child.id);

        let children = f.service.linked_children(&f.parent).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, f.child.id);
    }

    #[tokio::test]
    async fn test_approve_is_idempotent() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        let first = f.service.approve(&f.parent, f.child.id).await.unwrap();
        let second = f.service.approve(&f.parent, f.child.id).await.unwrap();
        assert_eq!(first.child_id, second.child_id);

        // Exactly one relationship row
        let children = f.service.linked_children(&f.parent).await.unwrap();
        assert_eq!(children.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_without_request() {
        let f = fixture().await;
        let result = f.service.approve(&f.parent, f.child.id).await;
        assert!(matches!(result, Err(LinkError::NotFound)));
    }

    #[tokio::test]
    async fn test_reject_then_fresh_redeem() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        f.service.reject(&f.parent, f.child.id).await.unwrap();
        assert!(f
            .service
            .linked_children(&f.parent)
            .await
            .unwrap()
            .is_empty());

        // A fresh code can be redeemed after rejection
        let token2 = f.service.generate_code(&f.parent).await.unwrap();
        let outcome = f.service.redeem_code(&f.child, &token2.code).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_unlink_removes_relationship() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();
        f.service.approve(&f.parent, f.child.id).await.unwrap();

        f.service.unlink(&f.parent, f.child.id).await.unwrap();
        assert!(f
            .service
            .linked_children(&f.parent)
            .await
            .unwrap()
            .is_empty());

        // Unlinking again reports not found
        let again = f.service.unlink(&f.parent, f.child.id).await;
        assert!(matches!(again, Err(LinkError::NotFound)));
    }

    #[tokio::test]
    async fn test_child_link_status_transitions() {
        let f = fixture().await;
        let status = f.service.child_link_status(&f.child).await.unwrap();
        assert_eq!(status.status, LinkStatus::None);
        assert!(status.parent.is_none());

        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();
        let status = f.service.child_link_status(&f.child).await.unwrap();
        assert_eq!(status.status, LinkStatus::Pending);
        assert_eq!(status.parent.as_ref().unwrap().id, f.parent.id);

        f.service.approve(&f.parent, f.child.id).await.unwrap();
        let status = f.service.child_link_status(&f.child).await.unwrap();
        assert_eq!(status.status, LinkStatus::Linked);
        assert_eq!(status.parent.unwrap().id, f.parent.id);
    }

    #[tokio::test]
    async fn test_pending_requests_listing() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        let pending = f.service.pending_requests(&f.parent).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].child_id, f.child.id);
        assert!(!pending[0].child_display_name.is_empty());
    }

    #[tokio::test]
    async fn test_expire_stale_requests() {
        let f = fixture().await;
        let token = f.service.generate_code(&f.parent).await.unwrap();
        f.service.redeem_code(&f.child, &token.code).await.unwrap();

        // A zero TTL expires everything pending
        let expired = f
            .service
            .expire_stale_requests(chrono::Duration::zero())
            .await
            .unwrap();
        assert_eq!(expired, 1);

        let status = f.service.child_link_status(&f.child).await.unwrap();
        assert_eq!(status.status, LinkStatus::None);
    }
}
