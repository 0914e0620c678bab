//! Location entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::LocationSample;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<LocationEntity> for LocationSample {
    fn from(entity: LocationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            accuracy_m: entity.accuracy_m,
            recorded_at: entity.recorded_at,
            created_at: entity.created_at,
        }
    }
}
