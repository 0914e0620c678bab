//! Alert entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AlertEvent, AlertKind};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for alert_kind that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "alert_kind", rename_all = "snake_case")]
pub enum AlertKindDb {
    Emergency,
    SafeArrival,
    DangerZoneEntry,
}

impl From<AlertKindDb> for AlertKind {
    fn from(db_kind: AlertKindDb) -> Self {
        match db_kind {
            AlertKindDb::Emergency => AlertKind::Emergency,
            AlertKindDb::SafeArrival => AlertKind::SafeArrival,
            AlertKindDb::DangerZoneEntry => AlertKind::DangerZoneEntry,
        }
    }
}

impl From<AlertKind> for AlertKindDb {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Emergency => AlertKindDb::Emergency,
            AlertKind::SafeArrival => AlertKindDb::SafeArrival,
            AlertKind::DangerZoneEntry => AlertKindDb::DangerZoneEntry,
        }
    }
}

/// Database row mapping for the alerts table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: AlertKindDb,
    pub latitude: f64,
    pub longitude: f64,
    pub message: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<AlertEntity> for AlertEvent {
    fn from(entity: AlertEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            kind: entity.kind.into(),
            latitude: entity.latitude,
            longitude: entity.longitude,
            message: entity.message,
            is_active: entity.is_active,
            created_at: entity.created_at,
            resolved_at: entity.resolved_at,
        }
    }
}
