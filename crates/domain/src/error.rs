//! Domain error taxonomy.

use thiserror::Error;

/// Errors produced by domain operations and the storage seam.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn area_not_found(area_id: uuid::Uuid) -> Self {
        DomainError::NotFound(format!("Area {} not found", area_id))
    }

    pub fn point_not_found(point_id: &str) -> Self {
        DomainError::NotFound(format!("Point '{}' not found in area", point_id))
    }

    pub fn measurement_not_found(measurement_id: i64) -> Self {
        DomainError::NotFound(format!("Measurement {} not found", measurement_id))
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::InvalidArgument(errors.to_string())
    }
}
