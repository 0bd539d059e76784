//! Domain layer for the soil survey backend.
//!
//! This crate contains:
//! - Domain models (Area, Measurement, points and progress views)
//! - The aggregate, sequencing and progress engines
//! - The survey workflow service and the storage/relay seams it drives
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{DomainError, DomainResult};
