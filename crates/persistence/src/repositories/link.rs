//! Link repository: the PostgreSQL-backed relationship store.
//!
//! Implements the domain's `LinkStore` seam. The two multi-writer
//! invariants are enforced here by conditional writes rather than locks:
//! one active token per parent (upsert keyed on parent_id) and one pending
//! request per pair (partial unique index, surfaced as a duplicate error).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{
    AccountSummary, AlertEvent, LinkRequest, LinkRequestState, LinkToken, LocationSample,
    Relationship,
};
use domain::services::{LinkStore, StoreError};

use crate::entities::{
    AccountEntity, AlertEntity, LinkRequestEntity, LinkRequestStateDb, LinkTokenEntity,
    LocationEntity, RelationshipEntity,
};
use crate::metrics::QueryTimer;
use crate::repositories::map_store_err;

/// Repository for linking-related database operations.
#[derive(Clone)]
pub struct LinkRepository {
    pool: PgPool,
}

impl LinkRepository {
    /// Creates a new LinkRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LinkStore for LinkRepository {
    async fn account_summary(&self, user_id: Uuid) -> Result<Option<AccountSummary>, StoreError> {
        let timer = QueryTimer::new("find_account_by_id");
        let result = sqlx::query_as::<_, AccountEntity>(
            r#"
            SELECT id, role, display_name, email, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn put_active_token(&self, token: LinkToken) -> Result<(), StoreError> {
        let timer = QueryTimer::new("put_active_token");
        // One row per parent: the upsert invalidates the previous code in
        // the same atomic write
        let result = sqlx::query(
            r#"
            INSERT INTO link_tokens (parent_id, code, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (parent_id)
            DO UPDATE SET code = $2, issued_at = $3, expires_at = $4
            "#,
        )
        .bind(token.parent_id)
        .bind(&token.code)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ()).map_err(map_store_err)
    }

    async fn find_active_token(&self, code: &str) -> Result<Option<LinkToken>, StoreError> {
        let timer = QueryTimer::new("find_active_token");
        let result = sqlx::query_as::<_, LinkTokenEntity>(
            r#"
            SELECT parent_id, code, issued_at, expires_at
            FROM link_tokens
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn consume_token(&self, parent_id: Uuid) -> Result<(), StoreError> {
        let timer = QueryTimer::new("consume_token");
        let result = sqlx::query(
            r#"
            DELETE FROM link_tokens
            WHERE parent_id = $1
            "#,
        )
        .bind(parent_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ()).map_err(map_store_err)
    }

    async fn find_pending_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let timer = QueryTimer::new("find_pending_request");
        let result = sqlx::query_as::<_, LinkRequestEntity>(
            r#"
            SELECT id, child_id, parent_id, state, created_at, resolved_at
            FROM link_requests
            WHERE child_id = $1 AND parent_id = $2 AND state = 'pending'
            "#,
        )
        .bind(child_id)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn find_pending_for_child(
        &self,
        child_id: Uuid,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let timer = QueryTimer::new("find_pending_for_child");
        let result = sqlx::query_as::<_, LinkRequestEntity>(
            r#"
            SELECT id, child_id, parent_id, state, created_at, resolved_at
            FROM link_requests
            WHERE child_id = $1 AND state = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn list_pending_requests(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<LinkRequest>, StoreError> {
        let timer = QueryTimer::new("list_pending_requests");
        let result = sqlx::query_as::<_, LinkRequestEntity>(
            r#"
            SELECT id, child_id, parent_id, state, created_at, resolved_at
            FROM link_requests
            WHERE parent_id = $1 AND state = 'pending'
            ORDER BY created_at ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|entities| entities.into_iter().map(Into::into).collect())
            .map_err(map_store_err)
    }

    async fn create_request(
        &self,
        child_id: Uuid,
        parent_id: Uuid,
    ) -> Result<LinkRequest, StoreError> {
        let timer = QueryTimer::new("create_link_request");
        // The partial unique index on (child_id, parent_id) WHERE pending
        // rejects a concurrent duplicate with 23505
        let result = sqlx::query_as::<_, LinkRequestEntity>(
            r#"
            INSERT INTO link_requests (child_id, parent_id, state)
            VALUES ($1, $2, 'pending')
            RETURNING id, child_id, parent_id, state, created_at, resolved_at
            "#,
        )
        .bind(child_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(map_store_err)
    }

    async fn resolve_request(
        &self,
        id: Uuid,
        outcome: LinkRequestState,
    ) -> Result<Option<LinkRequest>, StoreError> {
        let timer = QueryTimer::new("resolve_link_request");
        let outcome_db: LinkRequestStateDb = outcome.into();
        let result = sqlx::query_as::<_, LinkRequestEntity>(
            r#"
            UPDATE link_requests
            SET state = $2, resolved_at = NOW()
            WHERE id = $1 AND state = 'pending'
            RETURNING id, child_id, parent_id, state, created_at, resolved_at
            "#,
        )
        .bind(id)
        .bind(outcome_db)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn create_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<Relationship, StoreError> {
        let timer = QueryTimer::new("create_relationship");
        // The unique index on child_id keeps one guardian per child
        let result = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            INSERT INTO relationships (parent_id, child_id)
            VALUES ($1, $2)
            RETURNING parent_id, child_id, linked_at
            "#,
        )
        .bind(parent_id)
        .bind(child_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(map_store_err)
    }

    async fn delete_relationship(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("delete_relationship");
        let result = sqlx::query(
            r#"
            DELETE FROM relationships
            WHERE parent_id = $1 AND child_id = $2
            "#,
        )
        .bind(parent_id)
        .bind(child_id)
        .execute(&self.pool)
        .await;
        timer.record();
        result
            .map(|done| done.rows_affected() > 0)
            .map_err(map_store_err)
    }

    async fn list_children_of(&self, parent_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        let timer = QueryTimer::new("list_children_of");
        let result = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            SELECT parent_id, child_id, linked_at
            FROM relationships
            WHERE parent_id = $1
            ORDER BY linked_at ASC
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|entities| entities.into_iter().map(Into::into).collect())
            .map_err(map_store_err)
    }

    async fn find_parent_of(&self, child_id: Uuid) -> Result<Option<Relationship>, StoreError> {
        let timer = QueryTimer::new("find_parent_of");
        let result = sqlx::query_as::<_, RelationshipEntity>(
            r#"
            SELECT parent_id, child_id, linked_at
            FROM relationships
            WHERE child_id = $1
            "#,
        )
        .bind(child_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map(|entity| entity.map(Into::into))
            .map_err(map_store_err)
    }

    async fn expire_pending_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("expire_pending_requests");
        let result = sqlx::query(
            r#"
            UPDATE link_requests
            SET state = 'expired', resolved_at = NOW()
            WHERE state = 'pending' AND created_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.record();
        result
            .map(|done| done.rows_affected())
            .map_err(map_store_err)
    }

    async fn list_locations_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<LocationSample>, StoreError> {
        let timer = QueryTimer::new("list_locations_since");
        let result = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, user_id, latitude, longitude, accuracy_m, recorded_at, created_at
            FROM locations
            WHERE user_id = ANY($1) AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(user_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|entities| entities.into_iter().map(Into::into).collect())
            .map_err(map_store_err)
    }

    async fn list_alerts_since(
        &self,
        user_ids: &[Uuid],
        since: DateTime<Utc>,
    ) -> Result<Vec<AlertEvent>, StoreError> {
        let timer = QueryTimer::new("list_alerts_since");
        let result = sqlx::query_as::<_, AlertEntity>(
            r#"
            SELECT id, user_id, kind, latitude, longitude, message, is_active, created_at, resolved_at
            FROM alerts
            WHERE user_id = ANY($1) AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|entities| entities.into_iter().map(Into::into).collect())
            .map_err(map_store_err)
    }
}
