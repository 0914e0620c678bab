//! Background jobs.

pub mod expire_links;
pub mod scheduler;

pub use expire_links::ExpireLinkRequestsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
