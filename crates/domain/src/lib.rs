//! Domain layer for the FamLink backend.
//!
//! This crate contains:
//! - Domain models (accounts, pairing tokens, link requests, relationships,
//!   locations, alerts)
//! - The link state machine and authorization gate
//! - The family event fanout channel
//! - Domain error types

pub mod models;
pub mod services;
