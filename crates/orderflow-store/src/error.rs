//! Mapping from `sqlx` errors to the pipeline's error taxonomy.

use orderflow_core::error::{StorageError, TransportError};

const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE class 22: data exception.
const DATA_EXCEPTION_CLASS: &str = "22";
/// SQLSTATE class 23: integrity constraint violation.
const INTEGRITY_VIOLATION_CLASS: &str = "23";

/// Returns `true` if `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code == UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Returns `true` if `err` means the database could not be reached at all.
fn is_unavailable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Returns `true` if the database refused the values themselves.
fn is_data_rejection(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code.starts_with(DATA_EXCEPTION_CLASS) || code.starts_with(INTEGRITY_VIOLATION_CLASS)
        }),
        _ => false,
    }
}

pub(crate) fn storage_error(err: &sqlx::Error) -> StorageError {
    if is_unavailable(err) {
        StorageError::Unavailable(err.to_string())
    } else if is_data_rejection(err) {
        StorageError::Rejected(err.to_string())
    } else {
        StorageError::Database(err.to_string())
    }
}

pub(crate) fn transport_error(err: &sqlx::Error) -> TransportError {
    TransportError::Unavailable(err.to_string())
}
