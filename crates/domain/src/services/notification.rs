//! Push-notification boundary.
//!
//! Delivery itself is an external concern; this module defines the trait
//! the API layer implements against its gateway, plus a logging mock for
//! development and tests. Sends are best-effort and never fail the
//! originating request.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// What triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    LinkRequested,
    LinkApproved,
    LinkRejected,
    AlertRaised,
}

impl std::fmt::Display for PushKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PushKind::LinkRequested => "link_requested",
            PushKind::LinkApproved => "link_approved",
            PushKind::LinkRejected => "link_rejected",
            PushKind::AlertRaised => "alert_raised",
        };
        f.write_str(s)
    }
}

/// A notification handed to the delivery sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PushMessage {
    pub kind: PushKind,
    pub title: String,
    pub body: String,
    pub payload: Value,
}

/// Result of a push send attempt.
#[derive(Debug, Clone)]
pub enum PushResult {
    /// The gateway accepted the notification.
    Sent,
    /// The recipient has no registered delivery endpoint.
    NoEndpoint,
    /// Sending failed (non-blocking).
    Failed(String),
    /// Sending was skipped (e.g. push disabled).
    Skipped,
}

/// Push delivery sink.
#[async_trait::async_trait]
pub trait PushNotifier: Send + Sync {
    /// Deliver `message` to `recipient`'s devices, best-effort.
    async fn send(&self, recipient: Uuid, message: PushMessage) -> PushResult;
}

/// Mock notifier for development and testing.
///
/// Logs notifications but doesn't actually send them.
#[derive(Debug, Clone, Default)]
pub struct MockPushNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
}

impl MockPushNotifier {
    pub fn new() -> Self {
        Self {
            simulate_failure: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl PushNotifier for MockPushNotifier {
    async fn send(&self, recipient: Uuid, message: PushMessage) -> PushResult {
        if self.simulate_failure {
            tracing::warn!(
                recipient = %recipient,
                kind = %message.kind,
                "Mock push notifier simulating failure"
            );
            return PushResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            recipient = %recipient,
            kind = %message.kind,
            title = %message.title,
            "Mock: would send push notification"
        );

        PushResult::Sent
    }
}
