//! Family event fanout channel.
//!
//! Every inserted location sample or alert is published onto an in-process
//! broadcast bus. Each connected parent session holds a subscription whose
//! filter is evaluated per delivery against the live relationship store, so
//! approving or unlinking a child takes effect at the next delivery boundary
//! without resubscription. Delivery is at-least-once; overflow is surfaced
//! as a lag marker and the subscriber recovers with a catch-up poll.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AccountRole, FamilyEvent};
use crate::services::authorization::{Actor, AuthError};
use crate::services::store::{LinkStore, StoreError};

/// Default capacity of the broadcast bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// In-process broadcast bus carrying all family events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FamilyEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers. Events published while
    /// nobody listens are dropped; history is served by the catch-up poll.
    pub fn publish(&self, event: FamilyEvent) {
        let receivers = self.tx.receiver_count();
        if let Err(e) = self.tx.send(event) {
            debug!(event_id = %e.0.event_id(), "Event published with no subscribers");
        } else {
            debug!(receivers, "Event published");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn subscribe_raw(&self) -> broadcast::Receiver<FamilyEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

/// Hands out per-parent subscriptions over the shared bus.
#[derive(Clone)]
pub struct FanoutChannel {
    bus: EventBus,
    store: Arc<dyn LinkStore>,
}

impl FanoutChannel {
    pub fn new(bus: EventBus, store: Arc<dyn LinkStore>) -> Self {
        Self { bus, store }
    }

    /// Open a subscription delivering events from the parent's currently
    /// linked children. Only parents can subscribe.
    pub fn subscribe(&self, actor: &Actor) -> Result<FamilySubscription, AuthError> {
        if actor.role != AccountRole::Parent {
            return Err(AuthError::RoleViolation {
                required: AccountRole::Parent,
            });
        }
        Ok(FamilySubscription {
            parent_id: actor.id,
            rx: self.bus.subscribe_raw(),
            store: self.store.clone(),
        })
    }
}

/// A delivery from a [`FamilySubscription`].
#[derive(Debug)]
pub enum FanoutMessage {
    Event(FamilyEvent),
    /// The receiver fell behind and `skipped` events were dropped; the
    /// consumer must run a catch-up poll to avoid a silent gap.
    Lagged {
        skipped: u64,
    },
}

/// One parent session's live view of its children's events.
///
/// Dropping the subscription (or calling [`close`](Self::close)) releases
/// the bus slot deterministically; subscribing again yields a fresh,
/// correctly filtered feed.
pub struct FamilySubscription {
    parent_id: Uuid,
    rx: broadcast::Receiver<FamilyEvent>,
    store: Arc<dyn LinkStore>,
}

impl FamilySubscription {
    pub fn parent_id(&self) -> Uuid {
        self.parent_id
    }

    /// Wait for the next deliverable message. Returns `None` when the bus
    /// has shut down.
    ///
    /// The relationship filter runs here, per event: a child unlinked after
    /// this subscription was opened is silently skipped, a child linked
    /// afterward starts flowing without resubscription.
    pub async fn next(&mut self) -> Option<FanoutMessage> {
        loop {
            match self.rx.recv().await {
                Ok(event) => match self.store.find_parent_of(event.user_id()).await {
                    Ok(Some(relationship)) if relationship.parent_id == self.parent_id => {
                        return Some(FanoutMessage::Event(event));
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        // Fail closed: an unverifiable event is not delivered
                        warn!(
                            parent_id = %self.parent_id,
                            error = %e,
                            "Relationship check failed, dropping event"
                        );
                        continue;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        parent_id = %self.parent_id,
                        skipped,
                        "Subscriber lagged behind the event bus"
                    );
                    return Some(FanoutMessage::Lagged { skipped });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Fetch events for the parent's current children captured at or after
    /// `since`, oldest first. Run after connecting and after a lag marker so
    /// feed gaps are never silent. Duplicates relative to live delivery are
    /// possible; consumers de-duplicate by event id.
    pub async fn catch_up(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<FamilyEvent>, StoreError> {
        let children: Vec<Uuid> = self
            .store
            .list_children_of(self.parent_id)
            .await?
            .into_iter()
            .map(|r| r.child_id)
            .collect();

        if children.is_empty() {
            return Ok(Vec::new());
        }

        let locations = self.store.list_locations_since(&children, since).await?;
        let alerts = self.store.list_alerts_since(&children, since).await?;

        let mut events: Vec<FamilyEvent> = locations
            .into_iter()
            .map(FamilyEvent::Location)
            .chain(alerts.into_iter().map(FamilyEvent::Alert))
            .collect();
        events.sort_by_key(|e| e.occurred_at());
        Ok(events)
    }

    /// Release the underlying feed resource.
    pub fn close(self) {
        drop(self);
    }
}
