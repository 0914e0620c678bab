//! Alert repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{AlertEntity, AlertKindDb};
use crate::metrics::QueryTimer;

/// Repository for alert-related database operations.
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Creates a new AlertRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a new alert in the active state.
    pub async fn insert(
        &self,
        user_id: Uuid,
        kind: AlertKindDb,
        latitude: f64,
        longitude: f64,
        message: Option<&str>,
    ) -> Result<AlertEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            INSERT INTO alerts (user_id, kind, latitude, longitude, message, is_active)
            VALUES ($1, $2, $3, $4, $5, true)
            RETURNING id, user_id, kind, latitude, longitude, message, is_active, created_at, resolved_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(latitude)
        .bind(longitude)
        .bind(message)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an alert by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AlertEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_alert_by_id");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT id, user_id, kind, latitude, longitude, message, is_active, created_at, resolved_at
            FROM alerts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Alerts for a user, newest first, optionally restricted to active ones.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
        limit: i64,
    ) -> Result<Vec<AlertEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_alerts_for_user");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT id, user_id, kind, latitude, longitude, message, is_active, created_at, resolved_at
            FROM alerts
            WHERE user_id = $1 AND (is_active = true OR $2 = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(active_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Resolve an active alert. The conditional update makes the true-to-
    /// false transition happen exactly once; a second resolve matches no
    /// row and returns `None`.
    pub async fn resolve(&self, id: Uuid) -> Result<Option<AlertEntity>, sqlx::Error> {
        let timer = QueryTimer::new("resolve_alert");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            UPDATE alerts
            SET is_active = false, resolved_at = NOW()
            WHERE id = $1 AND is_active = true
            RETURNING id, user_id, kind, latitude, longitude, message, is_active, created_at, resolved_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    // Note: AlertRepository tests require a database connection and are
    // covered by integration tests.
}
