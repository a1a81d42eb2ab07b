//! Store error types.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be opened or written at all. Fatal to a run.
    #[error("store unavailable at {location}: {reason}")]
    Unavailable { location: String, reason: String },

    /// A write hit a uniqueness constraint it should have been able to upsert
    /// over, usually because duplicates prevented a unique index from being
    /// created. Fatal to that write only.
    #[error("store conflict on {table}: {reason}")]
    Conflict { table: &'static str, reason: String },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Classify an error raised by a write to `table`.
    pub(crate) fn on_write(table: &'static str, err: rusqlite::Error) -> Self {
        if let Some(code) = err.sqlite_error_code() {
            if code == ErrorCode::ConstraintViolation {
                return StoreError::Conflict {
                    table,
                    reason: err.to_string(),
                };
            }
        }
        // Upserts prepared against a key that has no unique index fail at
        // prepare time with a generic error naming the ON CONFLICT clause.
        if err.to_string().contains("ON CONFLICT") {
            return StoreError::Conflict {
                table,
                reason: err.to_string(),
            };
        }
        StoreError::Sqlite(err)
    }

    /// True when the error means the store itself is unusable, as opposed to
    /// one write or one read failing.
    pub fn is_fatal(&self) -> bool {
        match self {
            StoreError::Unavailable { .. } => true,
            StoreError::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::DatabaseCorrupt
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::ReadOnly
                        | ErrorCode::DiskFull
                        | ErrorCode::PermissionDenied
                )
            ),
            StoreError::Conflict { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn constraint_violation_is_conflict() {
        let err = StoreError::on_write("news_articles", sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(matches!(err, StoreError::Conflict { table: "news_articles", .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn io_failures_are_fatal() {
        let err = StoreError::on_write("stock_daily_data", sqlite_failure(rusqlite::ffi::SQLITE_IOERR));
        assert!(err.is_fatal());
        let err = StoreError::Unavailable {
            location: "x.db".into(),
            reason: "denied".into(),
        };
        assert!(err.is_fatal());
    }
}
