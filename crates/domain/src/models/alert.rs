//! Safety-alert domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Kind of safety alert a child device can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Emergency,
    SafeArrival,
    DangerZoneEntry,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertKind::Emergency => "emergency",
            AlertKind::SafeArrival => "safe_arrival",
            AlertKind::DangerZoneEntry => "danger_zone_entry",
        };
        f.write_str(s)
    }
}

/// A safety alert raised by a child account.
///
/// `is_active` transitions true to false exactly once, by the owner or a
/// linked parent; all other fields are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlertEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: AlertKind,
    pub latitude: f64,
    pub longitude: f64,
    pub message: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request payload for raising an alert.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateAlertRequest {
    pub kind: AlertKind,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    pub message: Option<String>,
}
