//! Fanout event envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::AlertEvent;
use super::location::LocationSample;

/// An event distributed to a child's linked parent.
///
/// Delivery is at-least-once; the stable `event_id` lets consumers
/// de-duplicate after a reconnect or catch-up poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FamilyEvent {
    Location(LocationSample),
    Alert(AlertEvent),
}

impl FamilyEvent {
    /// Stable identifier of the underlying row.
    pub fn event_id(&self) -> Uuid {
        match self {
            FamilyEvent::Location(sample) => sample.id,
            FamilyEvent::Alert(alert) => alert.id,
        }
    }

    /// The account that produced the event.
    pub fn user_id(&self) -> Uuid {
        match self {
            FamilyEvent::Location(sample) => sample.user_id,
            FamilyEvent::Alert(alert) => alert.user_id,
        }
    }

    /// Capture/creation time, used to order catch-up batches.
    pub fn occurred_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            FamilyEvent::Location(sample) => sample.recorded_at,
            FamilyEvent::Alert(alert) => alert.created_at,
        }
    }
}
