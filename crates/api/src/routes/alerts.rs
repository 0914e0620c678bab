//! Alert routes: owner-only creation, relationship-scoped reads, and the
//! one-shot resolve transition.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{AlertEvent, CreateAlertRequest, FamilyEvent};
use domain::services::{AuthAction, LinkStore, PushKind, PushMessage};
use persistence::repositories::AlertRepository;
use shared::pagination::clamp_limit;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

const DEFAULT_ALERTS_LIMIT: i64 = 50;
const MAX_ALERTS_LIMIT: i64 = 200;

/// Query parameters for alert listing.
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    /// Restrict to unresolved alerts.
    #[serde(default)]
    pub active: bool,
    pub limit: Option<i64>,
}

/// Raise a safety alert for the calling account.
///
/// POST /api/v1/alerts
///
/// Publishes to the family event feed and notifies the linked guardian.
pub async fn create_alert(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<AlertEvent>), ApiError> {
    request.validate()?;

    state
        .gate
        .authorize(&user_auth.actor(), user_auth.user_id, AuthAction::WriteOwn)
        .await?;

    let repo = AlertRepository::new(state.pool.clone());
    let entity = repo
        .insert(
            user_auth.user_id,
            request.kind.into(),
            request.latitude,
            request.longitude,
            request.message.as_deref(),
        )
        .await?;

    let alert: AlertEvent = entity.into();
    state.bus.publish(FamilyEvent::Alert(alert.clone()));

    info!(
        user_id = %user_auth.user_id,
        alert_id = %alert.id,
        kind = %alert.kind,
        "Alert raised"
    );

    // Best-effort push to the linked guardian
    if let Ok(Some(relationship)) = state
        .link_service
        .store()
        .find_parent_of(user_auth.user_id)
        .await
    {
        state
            .notifier
            .send(
                relationship.parent_id,
                PushMessage {
                    kind: PushKind::AlertRaised,
                    title: format!("Safety alert: {}", alert.kind),
                    body: alert.message.clone().unwrap_or_else(|| {
                        "A new safety alert was raised".to_string()
                    }),
                    payload: serde_json::json!({
                        "alert_id": alert.id,
                        "child_id": alert.user_id,
                        "kind": alert.kind,
                    }),
                },
            )
            .await;
    }

    Ok((StatusCode::CREATED, Json(alert)))
}

/// Alerts for a user, newest first.
///
/// GET /api/v1/users/:user_id/alerts?active=&limit=
///
/// Allowed for the owner and for the linked parent.
pub async fn list_alerts(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<AlertEvent>>, ApiError> {
    let action = if user_auth.user_id == user_id {
        AuthAction::ReadOwn
    } else {
        AuthAction::ReadChild
    };
    state
        .gate
        .authorize(&user_auth.actor(), user_id, action)
        .await?;

    let limit = clamp_limit(query.limit, DEFAULT_ALERTS_LIMIT, MAX_ALERTS_LIMIT);
    let repo = AlertRepository::new(state.pool.clone());
    let entities = repo.list_for_user(user_id, query.active, limit).await?;

    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

/// Resolve an active alert.
///
/// POST /api/v1/alerts/:alert_id/resolve
///
/// Allowed for the alert owner and the linked parent. The active flag
/// transitions exactly once; resolving twice is a conflict.
pub async fn resolve_alert(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertEvent>, ApiError> {
    let repo = AlertRepository::new(state.pool.clone());

    let alert = repo
        .find_by_id(alert_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?;

    state
        .gate
        .authorize(&user_auth.actor(), alert.user_id, AuthAction::ResolveAlert)
        .await?;

    let resolved = repo
        .resolve(alert_id)
        .await?
        .ok_or(ApiError::AlertAlreadyResolved)?;

    info!(
        alert_id = %alert_id,
        resolved_by = %user_auth.user_id,
        "Alert resolved"
    );

    Ok(Json(resolved.into()))
}
