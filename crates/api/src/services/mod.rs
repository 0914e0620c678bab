//! API-layer services.

pub mod push;
