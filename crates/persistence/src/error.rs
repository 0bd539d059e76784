//! Mapping of database errors onto the domain taxonomy.

use domain::DomainError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Converts a sqlx error into a `DomainError`.
pub fn map_db_error(err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::RowNotFound => DomainError::NotFound("Resource not found".into()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                DomainError::Conflict("Point ID already exists in this area".into())
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                DomainError::NotFound("Referenced area not found".into())
            }
            _ => {
                tracing::error!(error = %db_err, "Database error");
                DomainError::Internal(format!("Database error: {}", db_err))
            }
        },
        other => {
            tracing::error!(error = %other, "Database error");
            DomainError::Internal(format!("Database error: {}", other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            DomainError::NotFound(_)
        ));
    }

    #[test]
    fn test_pool_errors_map_to_internal() {
        assert!(matches!(
            map_db_error(sqlx::Error::PoolTimedOut),
            DomainError::Internal(_)
        ));
    }
}
