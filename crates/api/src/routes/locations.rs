//! Location routes: owner-only ingestion and relationship-scoped reads.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use domain::models::{FamilyEvent, LocationSample, UploadLocationRequest};
use domain::services::AuthAction;
use persistence::repositories::LocationRepository;
use shared::pagination::{clamp_limit, decode_cursor, encode_cursor};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const MAX_HISTORY_LIMIT: i64 = 500;

/// Query parameters for location history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Only samples captured at or after this instant.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
}

/// One page of location history, newest first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationHistoryResponse {
    pub data: Vec<LocationSample>,
    /// Present when another page may exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Upload a position sample for the calling account.
///
/// POST /api/v1/locations
///
/// Samples are immutable once written; the insert is published to the
/// family event feed.
pub async fn upload_location(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Json(request): Json<UploadLocationRequest>,
) -> Result<(StatusCode, Json<LocationSample>), ApiError> {
    request.validate()?;

    state
        .gate
        .authorize(&user_auth.actor(), user_auth.user_id, AuthAction::WriteOwn)
        .await?;

    let repo = LocationRepository::new(state.pool.clone());
    let recorded_at = request.recorded_at.unwrap_or_else(Utc::now);
    let entity = repo
        .insert(
            user_auth.user_id,
            request.latitude,
            request.longitude,
            request.accuracy_m,
            recorded_at,
        )
        .await?;

    let sample: LocationSample = entity.into();
    state.bus.publish(FamilyEvent::Location(sample.clone()));

    debug!(user_id = %user_auth.user_id, sample_id = %sample.id, "Location sample stored");

    Ok((StatusCode::CREATED, Json(sample)))
}

/// The most recent sample for a user.
///
/// GET /api/v1/users/:user_id/locations/latest
///
/// Allowed for the owner and for the linked parent.
pub async fn latest_location(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Json<LocationSample>, ApiError> {
    authorize_read(&state, &user_auth, user_id).await?;

    let repo = LocationRepository::new(state.pool.clone());
    let entity = repo
        .latest_for_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No location recorded for this user".to_string()))?;

    Ok(Json(entity.into()))
}

/// Location history for a user, newest first.
///
/// GET /api/v1/users/:user_id/locations?since=&limit=&cursor=
pub async fn list_locations(
    State(state): State<AppState>,
    user_auth: UserAuth,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<LocationHistoryResponse>, ApiError> {
    authorize_read(&state, &user_auth, user_id).await?;

    let since = query
        .since
        .unwrap_or_else(|| Utc::now() - chrono::Duration::hours(24));
    let limit = clamp_limit(query.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);

    let before = match query.cursor.as_deref() {
        Some(cursor) => {
            let (timestamp, _) = decode_cursor(cursor)
                .map_err(|e| ApiError::Validation(format!("cursor: {}", e)))?;
            Some(timestamp)
        }
        None => None,
    };

    let repo = LocationRepository::new(state.pool.clone());
    let entities = repo
        .list_for_user_since(user_id, since, before, limit)
        .await?;

    let data: Vec<LocationSample> = entities.into_iter().map(Into::into).collect();
    let next_cursor = if data.len() as i64 == limit {
        data.last().map(|s| encode_cursor(s.recorded_at, s.id))
    } else {
        None
    };

    Ok(Json(LocationHistoryResponse { data, next_cursor }))
}

/// Owner reads use read_own; anyone else must be the linked parent.
async fn authorize_read(
    state: &AppState,
    user_auth: &UserAuth,
    target_id: Uuid,
) -> Result<(), ApiError> {
    let action = if user_auth.user_id == target_id {
        AuthAction::ReadOwn
    } else {
        AuthAction::ReadChild
    };
    state
        .gate
        .authorize(&user_auth.actor(), target_id, action)
        .await?;
    Ok(())
}
