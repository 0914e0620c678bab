//! Family event feed over WebSocket.
//!
//! Streams the calling parent's family events as JSON frames. Browsers
//! cannot attach headers to WebSocket upgrades, so the bearer token rides a
//! `token` query parameter. An optional `since` parameter triggers an
//! initial catch-up poll; the same poll runs whenever the subscriber falls
//! behind the bus, so gaps are never silent. Events carry stable ids and
//! may be delivered more than once; clients de-duplicate by id.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use domain::models::FamilyEvent;
use domain::services::{Actor, FamilySubscription, FanoutMessage};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_event_delivered;
use crate::middleware::user_auth::{create_jwt_config, validate_bearer};

/// Query parameters for the event feed.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub token: String,
    /// Catch up on events captured at or after this instant before
    /// streaming live ones.
    pub since: Option<DateTime<Utc>>,
}

/// GET /api/v1/family/events
pub async fn family_events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Response {
    let jwt = match create_jwt_config(&state.config.jwt) {
        Ok(jwt) => jwt,
        Err(e) => return ApiError::Internal(e).into_response(),
    };

    let user = match validate_bearer(&jwt, &query.token) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };
    let actor = Actor::new(user.user_id, user.role);

    // Reject non-parents before upgrading
    let subscription = match state.fanout.subscribe(&actor) {
        Ok(subscription) => subscription,
        Err(e) => return ApiError::from(e).into_response(),
    };

    info!(parent_id = %actor.id, "Family event feed connected");

    ws.on_upgrade(move |socket| handle_socket(socket, subscription, query.since))
}

async fn handle_socket(
    socket: WebSocket,
    mut subscription: FamilySubscription,
    since: Option<DateTime<Utc>>,
) {
    let parent_id = subscription.parent_id();
    let (mut sender, mut receiver) = socket.split();

    // Watermark for catch-up after a lag; starts at the reconnect cursor
    let mut last_seen = since.unwrap_or_else(Utc::now);

    // Initial catch-up covers the disconnect gap
    if since.is_some() {
        match subscription.catch_up(last_seen).await {
            Ok(events) => {
                for event in events {
                    last_seen = last_seen.max(event.occurred_at());
                    if send_event(&mut sender, &event).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(parent_id = %parent_id, error = %e, "Catch-up poll failed");
            }
        }
    }

    loop {
        tokio::select! {
            message = subscription.next() => match message {
                Some(FanoutMessage::Event(event)) => {
                    last_seen = last_seen.max(event.occurred_at());
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Some(FanoutMessage::Lagged { skipped }) => {
                    debug!(parent_id = %parent_id, skipped, "Feed lagged, running catch-up");
                    match subscription.catch_up(last_seen).await {
                        Ok(events) => {
                            let mut failed = false;
                            for event in events {
                                last_seen = last_seen.max(event.occurred_at());
                                if send_event(&mut sender, &event).await.is_err() {
                                    failed = true;
                                    break;
                                }
                            }
                            if failed {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(parent_id = %parent_id, error = %e, "Catch-up poll failed");
                        }
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Pings are answered by axum; other client frames are ignored
                Some(Ok(_)) => {}
            },
        }
    }

    info!(parent_id = %parent_id, "Family event feed disconnected");
}

async fn send_event(
    sender: &mut (impl SinkExt<Message> + Unpin),
    event: &FamilyEvent,
) -> Result<(), ()> {
    let frame = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize family event");
            return Ok(());
        }
    };

    match event {
        FamilyEvent::Location(_) => record_event_delivered("location"),
        FamilyEvent::Alert(_) => record_event_delivered("alert"),
    }

    sender.send(Message::Text(frame)).await.map_err(|_| ())
}
