//! Shared utilities and common types for the soil survey backend.
//!
//! This crate provides functionality used across the other crates:
//! - JWT bearer token validation
//! - Common validation logic for coordinates, soil metrics and point identifiers

pub mod jwt;
pub mod validation;
