//! Repository implementations.

pub mod alert;
pub mod link;
pub mod location;

pub use alert::AlertRepository;
pub use link::LinkRepository;
pub use location::LocationRepository;

use domain::services::StoreError;

/// Maps a sqlx error onto the domain store error.
///
/// Unique-constraint violations (Postgres 23505) become
/// [`StoreError::Duplicate`], which the link state machine treats as a
/// recoverable "already exists" signal.
pub(crate) fn map_store_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Duplicate;
        }
    }
    StoreError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_store_err_non_database() {
        let err = map_store_err(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
