//! Location repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::LocationEntity;
use crate::metrics::QueryTimer;

/// Repository for location-related database operations.
#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a position sample. Samples are append-only; corrections are
    /// new rows.
    pub async fn insert(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<LocationEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_location");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            INSERT INTO locations (user_id, latitude, longitude, accuracy_m, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, latitude, longitude, accuracy_m, recorded_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .bind(accuracy_m)
        .bind(recorded_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// The most recent sample for a user, if any.
    pub async fn latest_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LocationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("latest_location_for_user");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, user_id, latitude, longitude, accuracy_m, recorded_at, created_at
            FROM locations
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Samples for a user captured at or after `since`, newest first.
    /// `before` anchors cursor pagination: only samples strictly older than
    /// it are returned.
    pub async fn list_for_user_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<LocationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_locations_for_user");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, user_id, latitude, longitude, accuracy_m, recorded_at, created_at
            FROM locations
            WHERE user_id = $1
              AND recorded_at >= $2
              AND ($3::timestamptz IS NULL OR recorded_at < $3)
            ORDER BY recorded_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete samples older than the retention window. Returns the number of
    /// rows removed.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_old_locations");
        let result = sqlx::query(
            r#"
            DELETE FROM locations
            WHERE recorded_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
