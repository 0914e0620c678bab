//! End-to-end linking and fanout flows over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use domain::models::{
    AccountRole, AlertEvent, AlertKind, FamilyEvent, LinkStatus, LinkToken, LocationSample,
};
use domain::services::{
    Actor, EventBus, FanoutChannel, FanoutMessage, LinkError, LinkService, LinkStore,
    MemoryLinkStore,
};

struct Family {
    store: Arc<MemoryLinkStore>,
    service: LinkService,
    bus: EventBus,
    channel: FanoutChannel,
    parent: Actor,
    child: Actor,
}

async fn family() -> Family {
    let store = Arc::new(MemoryLinkStore::new());
    let parent = Actor::new(Uuid::new_v4(), AccountRole::Parent);
    let child = Actor::new(Uuid::new_v4(), AccountRole::Child);
    store
        .register_account(parent.id, AccountRole::Parent, "Dana")
        .await;
    store
        .register_account(child.id, AccountRole::Child, "Leo")
        .await;

    let bus = EventBus::new(32);
    Family {
        service: LinkService::new(store.clone()),
        channel: FanoutChannel::new(bus.clone(), store.clone()),
        store,
        bus,
        parent,
        child,
    }
}

fn location_for(user_id: Uuid) -> LocationSample {
    let now = Utc::now();
    LocationSample {
        id: Uuid::new_v4(),
        user_id,
        latitude: 40.4168,
        longitude: -3.7038,
        accuracy_m: Some(8.0),
        recorded_at: now,
        created_at: now,
    }
}

fn alert_for(user_id: Uuid) -> AlertEvent {
    let now = Utc::now();
    AlertEvent {
        id: Uuid::new_v4(),
        user_id,
        kind: AlertKind::Emergency,
        latitude: 40.4168,
        longitude: -3.7038,
        message: Some("Help".to_string()),
        is_active: true,
        created_at: now,
        resolved_at: None,
    }
}

/// Parent generates a code, child redeems it, parent approves, and the
/// relationship becomes visible on both sides. A second child probing the
/// same code finds it already consumed.
#[tokio::test]
async fn full_link_flow_consumes_code() {
    let f = family().await;

    let token = f.service.generate_code(&f.parent).await.unwrap();
    let outcome = f.service.redeem_code(&f.child, &token.code).await.unwrap();
    assert_eq!(outcome.parent_display_name, "Dana");

    f.service.approve(&f.parent, f.child.id).await.unwrap();

    let children = f.service.linked_children(&f.parent).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, f.child.id);

    let status = f.service.child_link_status(&f.child).await.unwrap();
    assert_eq!(status.status, LinkStatus::Linked);

    // c2 tries the consumed code a few minutes later
    let c2 = Actor::new(Uuid::new_v4(), AccountRole::Child);
    f.store
        .register_account(c2.id, AccountRole::Child, "Mia")
        .await;
    let result = f.service.redeem_code(&c2, &token.code).await;
    assert!(matches!(result, Err(LinkError::InvalidCode)));
}

/// A code generated and never redeemed fails with ExpiredCode once its
/// 15-minute lifetime has elapsed.
#[tokio::test]
async fn stale_code_expires() {
    let f = family().await;

    // Issue a token whose clock started 16 minutes ago
    let issued = Utc::now() - chrono::Duration::minutes(16);
    let token = LinkToken::issue(f.parent.id, issued);
    let code = token.code.clone();
    f.store.put_active_token(token).await.unwrap();

    let result = f.service.redeem_code(&f.child, &code).await;
    assert!(matches!(result, Err(LinkError::ExpiredCode)));
}

/// After approval, the child's events reach the parent's open subscription;
/// the subscription does not need to be re-opened.
#[tokio::test]
async fn approved_child_events_reach_parent() {
    let f = family().await;
    let mut subscription = f.channel.subscribe(&f.parent).unwrap();

    let token = f.service.generate_code(&f.parent).await.unwrap();
    f.service.redeem_code(&f.child, &token.code).await.unwrap();
    f.service.approve(&f.parent, f.child.id).await.unwrap();

    let event = FamilyEvent::Location(location_for(f.child.id));
    f.bus.publish(event.clone());

    let delivered = tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await
        .expect("delivery timed out")
        .expect("bus closed");
    match delivered {
        FanoutMessage::Event(e) => {
            assert_eq!(e.event_id(), event.event_id());
            assert_eq!(e.user_id(), f.child.id);
        }
        other => panic!("Expected event, got {:?}", other),
    }
}

/// After unlink, later events from the child are never delivered to the
/// parent's subscription.
#[tokio::test]
async fn unlinked_child_events_never_delivered() {
    let f = family().await;

    let token = f.service.generate_code(&f.parent).await.unwrap();
    f.service.redeem_code(&f.child, &token.code).await.unwrap();
    f.service.approve(&f.parent, f.child.id).await.unwrap();

    let mut subscription = f.channel.subscribe(&f.parent).unwrap();
    f.service.unlink(&f.parent, f.child.id).await.unwrap();

    f.bus.publish(FamilyEvent::Location(location_for(f.child.id)));
    f.bus.publish(FamilyEvent::Alert(alert_for(f.child.id)));

    let outcome = tokio::time::timeout(Duration::from_millis(150), subscription.next()).await;
    assert!(outcome.is_err(), "Event delivered after unlink");
}

/// Catch-up after a reconnect returns the events inserted during the gap,
/// scoped to linked children only.
#[tokio::test]
async fn catch_up_covers_disconnect_gap() {
    let f = family().await;

    let token = f.service.generate_code(&f.parent).await.unwrap();
    f.service.redeem_code(&f.child, &token.code).await.unwrap();
    f.service.approve(&f.parent, f.child.id).await.unwrap();

    let disconnected_at = Utc::now();

    // Events land while no subscription is open
    let missed_location = location_for(f.child.id);
    let missed_alert = alert_for(f.child.id);
    f.store.insert_location(missed_location.clone()).await;
    f.store.insert_alert(missed_alert.clone()).await;
    f.store.insert_location(location_for(Uuid::new_v4())).await;

    let subscription = f.channel.subscribe(&f.parent).unwrap();
    let events = subscription.catch_up(disconnected_at).await.unwrap();

    let ids: Vec<Uuid> = events.iter().map(|e| e.event_id()).collect();
    assert_eq!(events.len(), 2);
    assert!(ids.contains(&missed_location.id));
    assert!(ids.contains(&missed_alert.id));
}

/// Rejection returns the pair to the unlinked state and a fresh code can be
/// redeemed afterward.
#[tokio::test]
async fn rejected_child_can_retry() {
    let f = family().await;

    let token = f.service.generate_code(&f.parent).await.unwrap();
    f.service.redeem_code(&f.child, &token.code).await.unwrap();
    f.service.reject(&f.parent, f.child.id).await.unwrap();

    let status = f.service.child_link_status(&f.child).await.unwrap();
    assert_eq!(status.status, LinkStatus::None);

    let token2 = f.service.generate_code(&f.parent).await.unwrap();
    let outcome = f.service.redeem_code(&f.child, &token2.code).await;
    assert!(outcome.is_ok());
}
