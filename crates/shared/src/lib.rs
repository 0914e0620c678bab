//! Shared utilities and common types for the FamLink backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Bearer-token validation for the external identity provider
//! - Common validation logic (pairing codes, coordinates)
//! - Cursor-based pagination

pub mod jwt;
pub mod pagination;
pub mod validation;
