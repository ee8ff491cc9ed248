//! Shared translation of pool and Diesel failures into repository errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Constructors a repository error type offers to the shared mapping.
pub(crate) struct ErrorConstructors<E> {
    pub connection: fn(String) -> E,
    pub query: fn(String) -> E,
    pub not_found: fn(String) -> E,
    /// `None` folds uniqueness violations into query errors.
    pub conflict: Option<fn(String) -> E>,
}

/// Pool failures always mean the database is unreachable.
pub(crate) fn map_pool_error<E>(error: PoolError, ctors: &ErrorConstructors<E>) -> E {
    (ctors.connection)(error.message().to_owned())
}

pub(crate) fn map_diesel_error<E>(error: DieselError, ctors: &ErrorConstructors<E>) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => (ctors.not_found)("record not found".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let message = info.message().to_owned();
            match ctors.conflict {
                Some(conflict) => conflict(message),
                None => (ctors.query)(message),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            (ctors.not_found)(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            (ctors.connection)("database connection closed".to_owned())
        }
        DieselError::QueryBuilderError(_) => (ctors.query)("database query error".to_owned()),
        _ => (ctors.query)("database error".to_owned()),
    }
}
