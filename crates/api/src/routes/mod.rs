//! Route handlers.

pub mod alerts;
pub mod events;
pub mod health;
pub mod linking;
pub mod locations;
