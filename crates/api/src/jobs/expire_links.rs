//! Pending link request expiry sweeper.
//!
//! A pending request the parent never resolves would otherwise live
//! forever and block the child from redeeming a fresh code for the same
//! guardian. This job resolves requests older than the configured TTL to
//! the expired state; the child can redeem again afterward.

use domain::services::LinkService;

use super::scheduler::{Job, JobFrequency};

/// Expires pending link requests past their TTL.
pub struct ExpireLinkRequestsJob {
    service: LinkService,
    ttl_hours: i64,
    interval_minutes: u64,
}

impl ExpireLinkRequestsJob {
    pub fn new(service: LinkService, ttl_hours: i64, interval_minutes: u64) -> Self {
        Self {
            service,
            ttl_hours,
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ExpireLinkRequestsJob {
    fn name(&self) -> &'static str {
        "expire_link_requests"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        self.service
            .expire_stale_requests(chrono::Duration::hours(self.ttl_hours))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::AccountRole;
    use domain::services::{Actor, LinkStore, MemoryLinkStore};
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_job_expires_stale_requests() {
        let store = Arc::new(MemoryLinkStore::new());
        let parent = Actor::new(Uuid::new_v4(), AccountRole::Parent);
        let child_id = Uuid::new_v4();
        store
            .register_account(parent.id, AccountRole::Parent, "Dana")
            .await;
        store.create_request(child_id, parent.id).await.unwrap();

        let service = LinkService::new(store.clone());
        // Zero-hour TTL expires everything pending
        let job = ExpireLinkRequestsJob::new(service, 0, 15);
        job.execute().await.unwrap();

        let pending = store
            .find_pending_request(child_id, parent.id)
            .await
            .unwrap();
        assert!(pending.is_none());
    }

    #[tokio::test]
    async fn test_job_metadata() {
        let store = Arc::new(MemoryLinkStore::new());
        let job = ExpireLinkRequestsJob::new(LinkService::new(store), 24, 15);
        assert_eq!(job.name(), "expire_link_requests");
        assert!(matches!(job.frequency(), JobFrequency::Minutes(15)));
    }
}
