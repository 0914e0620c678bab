//! Linking protocol routes.
//!
//! The produced surface of the account-linking subsystem: code generation,
//! redemption, approval/rejection, unlinking, and the status reads both
//! sides of the relationship use.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::{
    ChildLinkStatusResponse, GenerateCodeResponse, LinkedChildSummary, PendingRequestSummary,
    RedeemCodeRequest, RedeemOutcome, Relationship,
};
use domain::services::{LinkStore, PushKind, PushMessage};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::record_link_established;

/// Response for listing pending link requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListPendingRequestsResponse {
    pub data: Vec<PendingRequestSummary>,
}

/// Response for listing linked children.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListChildrenResponse {
    pub data: Vec<LinkedChildSummary>,
}

/// Generate a fresh pairing code for the calling parent.
///
/// POST /api/v1/link/code
///
/// Replaces any previously active code for this parent.
pub async fn generate_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<(StatusCode, Json<GenerateCodeResponse>), ApiError> {
    let token = state
        .link_service
        .generate_code(&user_auth.actor())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateCodeResponse {
            code: token.code,
            expires_at: token.expires_at,
        }),
    ))
}

/// Redeem a pairing code on behalf of the calling child.
///
/// POST /api/v1/link/redeem
///
/// Creates a pending link request and notifies the issuing parent. The code
/// is consumed by this attempt regardless of outcome.
pub async fn redeem_code(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<RedeemCodeRequest>,
) -> Result<(StatusCode, Json<RedeemOutcome>), ApiError> {
    request.validate()?;

    let outcome = state
        .link_service
        .redeem_code(&user_auth.actor(), &request.code)
        .await?;

    // Best-effort: a failed push never fails the redemption
    let child_name = state
        .link_service
        .store()
        .account_summary(user_auth.user_id)
        .await
        .ok()
        .flatten()
        .map(|a| a.display_name)
        .unwrap_or_else(|| "A child".to_string());
    state
        .notifier
        .send(
            outcome.request.parent_id,
            PushMessage {
                kind: PushKind::LinkRequested,
                title: "New link request".to_string(),
                body: format!("{} wants to link with you", child_name),
                payload: serde_json::json!({
                    "request_id": outcome.request.id,
                    "child_id": outcome.request.child_id,
                }),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// List pending link requests addressed to the calling parent.
///
/// GET /api/v1/link/requests
pub async fn list_pending_requests(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ListPendingRequestsResponse>, ApiError> {
    let data = state
        .link_service
        .pending_requests(&user_auth.actor())
        .await?;
    Ok(Json(ListPendingRequestsResponse { data }))
}

/// Approve a pending link request.
///
/// POST /api/v1/link/requests/:child_id/approve
///
/// Creates the relationship; idempotent on retry. New events from the child
/// start flowing to the parent's open subscriptions immediately.
pub async fn approve_link(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(child_id): Path<Uuid>,
) -> Result<Json<Relationship>, ApiError> {
    let relationship = state
        .link_service
        .approve(&user_auth.actor(), child_id)
        .await?;

    record_link_established();

    state
        .notifier
        .send(
            child_id,
            PushMessage {
                kind: PushKind::LinkApproved,
                title: "Link approved".to_string(),
                body: "Your guardian approved the link request".to_string(),
                payload: serde_json::json!({ "parent_id": user_auth.user_id }),
            },
        )
        .await;

    Ok(Json(relationship))
}

/// Reject a pending link request.
///
/// POST /api/v1/link/requests/:child_id/reject
pub async fn reject_link(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(child_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .link_service
        .reject(&user_auth.actor(), child_id)
        .await?;

    state
        .notifier
        .send(
            child_id,
            PushMessage {
                kind: PushKind::LinkRejected,
                title: "Link rejected".to_string(),
                body: "Your guardian rejected the link request".to_string(),
                payload: serde_json::json!({ "parent_id": user_auth.user_id }),
            },
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// List the calling parent's linked children.
///
/// GET /api/v1/link/children
pub async fn list_linked_children(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ListChildrenResponse>, ApiError> {
    let data = state
        .link_service
        .linked_children(&user_auth.actor())
        .await?;
    Ok(Json(ListChildrenResponse { data }))
}

/// Remove the relationship with a child.
///
/// DELETE /api/v1/link/children/:child_id
///
/// The child's events stop reaching this parent's subscriptions at the next
/// delivery boundary.
pub async fn unlink_child(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(child_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .link_service
        .unlink(&user_auth.actor(), child_id)
        .await?;

    info!(
        parent_id = %user_auth.user_id,
        child_id = %child_id,
        "Relationship removed"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// The calling child's own link status.
///
/// GET /api/v1/link/status
pub async fn child_link_status(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ChildLinkStatusResponse>, ApiError> {
    let status = state
        .link_service
        .child_link_status(&user_auth.actor())
        .await?;
    Ok(Json(status))
}
