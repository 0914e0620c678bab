//! Authorization gate.
//!
//! Single enforcement point for the data-visibility rules: an account sees
//! its own data and, for parents, the data of explicitly linked children.
//! Every service touching relationship, location, or alert data calls this
//! gate before reaching storage.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::models::AccountRole;
use crate::services::store::{LinkStore, StoreError};

/// The authenticated account performing an operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: AccountRole,
}

impl Actor {
    pub fn new(id: Uuid, role: AccountRole) -> Self {
        Self { id, role }
    }
}

/// Action being authorized against a target account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Read data owned by the target; allowed only for the owner.
    ReadOwn,
    /// Read a child's data; allowed only for the linked parent.
    ReadChild,
    /// Write data owned by the target; allowed only for the owner.
    WriteOwn,
    /// Resolve an alert; allowed for the owner or the linked parent.
    ResolveAlert,
    /// Drive the linking protocol in the given role.
    ManageLink { as_role: AccountRole },
}

/// Error type for authorization decisions.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Operation requires the {required} role")]
    RoleViolation { required: AccountRole },

    #[error("Not authorized to access this user's data")]
    Denied,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evaluates the visibility rule table against the live relationship store.
#[derive(Clone)]
pub struct AuthorizationGate {
    store: Arc<dyn LinkStore>,
}

impl AuthorizationGate {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Allow or deny `action` by `actor` against `target_id`.
    pub async fn authorize(
        &self,
        actor: &Actor,
        target_id: Uuid,
        action: AuthAction,
    ) -> Result<(), AuthError> {
        match action {
            AuthAction::ReadOwn | AuthAction::WriteOwn => {
                if actor.id == target_id {
                    Ok(())
                } else {
                    Err(AuthError::Denied)
                }
            }
            AuthAction::ReadChild => {
                if actor.role != AccountRole::Parent {
                    return Err(AuthError::Denied);
                }
                if self.is_linked(actor.id, target_id).await? {
                    Ok(())
                } else {
                    Err(AuthError::Denied)
                }
            }
            AuthAction::ResolveAlert => {
                if actor.id == target_id || self.is_linked(actor.id, target_id).await? {
                    Ok(())
                } else {
                    Err(AuthError::Denied)
                }
            }
            AuthAction::ManageLink { as_role } => {
                if actor.role == as_role {
                    Ok(())
                } else {
                    Err(AuthError::RoleViolation { required: as_role })
                }
            }
        }
    }

    async fn is_linked(&self, parent_id: Uuid, child_id: Uuid) -> Result<bool, AuthError> {
        let relationship = self.store.find_parent_of(child_id).await?;
        Ok(relationship.is_some_and(|r| r.parent_id == parent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryLinkStore;

    async fn linked_pair() -> (AuthorizationGate, Actor, Actor, Arc<MemoryLinkStore>) {
        let store = Arc::new(MemoryLinkStore::new());
        let parent = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        let child = Actor::new(Uuid::new_v4(), AccountRole::Child);
        store.register_account(parent.id, AccountRole::Parent, "Dana").await;
        store.register_account(child.id, AccountRole::Child, "Leo").await;
        store
            .create_relationship(parent.id, child.id)
            .await
            .unwrap();
        let gate = AuthorizationGate::new(store.clone());
        (gate, parent, child, store)
    }

    #[tokio::test]
    async fn test_read_own_only_for_owner() {
        let (gate, parent, child, _) = linked_pair().await;
        assert!(gate
            .authorize(&child, child.id, AuthAction::ReadOwn)
            .await
            .is_ok());
        assert!(gate
            .authorize(&parent, child.id, AuthAction::ReadOwn)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_read_child_requires_relationship() {
        let (gate, parent, child, _) = linked_pair().await;
        assert!(gate
            .authorize(&parent, child.id, AuthAction::ReadChild)
            .await
            .is_ok());

        // An unrelated parent is denied
        let stranger = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        assert!(matches!(
            gate.authorize(&stranger, child.id, AuthAction::ReadChild)
                .await,
            Err(AuthError::Denied)
        ));
    }

    #[tokio::test]
    async fn test_read_child_denied_for_child_role() {
        let (gate, _, child, store) = linked_pair().await;
        // A sibling linked to the same parent still cannot read the other child
        let sibling = Actor::new(Uuid::new_v4(), AccountRole::Child);
        store
            .register_account(sibling.id, AccountRole::Child, "Mia")
            .await;
        assert!(matches!(
            gate.authorize(&sibling, child.id, AuthAction::ReadChild)
                .await,
            Err(AuthError::Denied)
        ));
    }

    #[tokio::test]
    async fn test_resolve_alert_owner_or_linked_parent() {
        let (gate, parent, child, _) = linked_pair().await;
        assert!(gate
            .authorize(&child, child.id, AuthAction::ResolveAlert)
            .await
            .is_ok());
        assert!(gate
            .authorize(&parent, child.id, AuthAction::ResolveAlert)
            .await
            .is_ok());

        let stranger = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        assert!(gate
            .authorize(&stranger, child.id, AuthAction::ResolveAlert)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_manage_link_role_check() {
        let (gate, parent, child, _) = linked_pair().await;
        let as_parent = AuthAction::ManageLink {
            as_role: AccountRole::Parent,
        };
        let as_child = AuthAction::ManageLink {
            as_role: AccountRole::Child,
        };

        assert!(gate.authorize(&parent, parent.id, as_parent).await.is_ok());
        assert!(gate.authorize(&child, child.id, as_child).await.is_ok());
        assert!(matches!(
            gate.authorize(&child, child.id, as_parent).await,
            Err(AuthError::RoleViolation {
                required: AccountRole::Parent
            })
        ));
        assert!(matches!(
            gate.authorize(&parent, parent.id, as_child).await,
            Err(AuthError::RoleViolation {
                required: AccountRole::Child
            })
        ));
    }

    #[tokio::test]
    async fn test_unlink_revokes_read_child() {
        let (gate, parent, child, store) = linked_pair().await;
        assert!(gate
            .authorize(&parent, child.id, AuthAction::ReadChild)
            .await
            .is_ok());

        store
            .delete_relationship(parent.id, child.id)
            .await
            .unwrap();

        assert!(gate
            .authorize(&parent, child.id, AuthAction::ReadChild)
            .await
            .is_err());
    }
}
