//! Persistence layer for the FamLink backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the PostgreSQL-backed
//!   relationship store consumed by the link state machine

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
