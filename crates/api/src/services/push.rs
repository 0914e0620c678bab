//! HTTP push-notification gateway client.
//!
//! Implements the domain's `PushNotifier` trait by POSTing notifications to
//! a configured gateway (the piece that knows about device tokens and
//! vendor push services). Delivery is best-effort: failures are logged and
//! reported, never propagated to the originating request.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use domain::services::{PushMessage, PushNotifier, PushResult};

use crate::config::PushConfig;

/// Push notifier delivering through an HTTP gateway.
pub struct HttpPushNotifier {
    client: Client,
    gateway_url: String,
}

/// Request body sent to the gateway.
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    recipient: Uuid,
    #[serde(flatten)]
    message: &'a PushMessage,
}

impl HttpPushNotifier {
    /// Create a new notifier against the configured gateway.
    pub fn new(config: &PushConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl PushNotifier for HttpPushNotifier {
    async fn send(&self, recipient: Uuid, message: PushMessage) -> PushResult {
        let body = GatewayRequest {
            recipient,
            message: &message,
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                debug!(
                    recipient = %recipient,
                    kind = %message.kind,
                    "Push notification accepted by gateway"
                );
                PushResult::Sent
            }
            Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                debug!(recipient = %recipient, "Recipient has no registered delivery endpoint");
                PushResult::NoEndpoint
            }
            Ok(response) => {
                warn!(
                    recipient = %recipient,
                    status = %response.status(),
                    "Push gateway rejected notification"
                );
                PushResult::Failed(format!("Gateway returned {}", response.status()))
            }
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "Push gateway unreachable");
                PushResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::PushKind;

    #[test]
    fn test_gateway_request_serialization() {
        let message = PushMessage {
            kind: PushKind::AlertRaised,
            title: "Safety alert".to_string(),
            body: "Emergency".to_string(),
            payload: serde_json::json!({ "alert_id": Uuid::nil() }),
        };
        let recipient = Uuid::new_v4();
        let body = GatewayRequest {
            recipient,
            message: &message,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["recipient"], recipient.to_string());
        assert_eq!(json["kind"], "alert_raised");
        assert_eq!(json["title"], "Safety alert");
    }

    #[test]
    fn test_notifier_rejects_bad_timeout_config() {
        let config = PushConfig {
            enabled: true,
            gateway_url: "http://localhost:9999/push".to_string(),
            timeout_ms: 5000,
        };
        assert!(HttpPushNotifier::new(&config).is_ok());
    }
}
