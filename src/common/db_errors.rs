//! Database error categorization
//!
//! The registry shares its tables with another writer, so the store has to
//! tell apart errors that are the caller's fault (duplicate keys), errors
//! that go away on retry (serialization failures, lock contention) and
//! errors that mean the database is not reachable.
//!
//! # Examples
//!
//! ```
//! use model_registry::common::db_errors::DbErrorKind;
//! use sea_orm::DbErr;
//!
//! let err = DbErr::RecordNotFound("registered_model".to_string());
//! assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
//! ```

use sea_orm::{DbErr, SqlErr};

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Record not found (query returned no results)
    NotFound,

    /// Unique constraint violation
    UniqueViolation,

    /// Foreign key constraint violation
    ForeignKeyViolation,

    /// Serialization failure, deadlock or lock contention.
    ///
    /// The transaction was rolled back and can be replayed as a whole.
    SerializationFailure,

    /// Database connection or pool acquisition error
    ConnectionError,

    /// Query timeout
    Timeout,

    /// Unknown/other database error
    Unknown,
}

impl DbErrorKind {
    /// Categorize a sea_orm database error
    pub fn from_db_err(err: &DbErr) -> Self {
        if let DbErr::RecordNotFound(_) = err {
            return Self::NotFound;
        }

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }

        let msg = err.to_string().to_lowercase();
        if is_serialization_message(&msg) {
            return Self::SerializationFailure;
        }

        match err {
            DbErr::Conn(_) if msg.contains("timeout") || msg.contains("timed out") => {
                Self::Timeout
            }
            DbErr::Conn(_) => Self::ConnectionError,
            DbErr::Exec(_) | DbErr::Query(_) => {
                if msg.contains("unique") || msg.contains("duplicate") {
                    Self::UniqueViolation
                } else if msg.contains("foreign key") {
                    Self::ForeignKeyViolation
                } else if msg.contains("pool timed out") || msg.contains("connection") {
                    Self::ConnectionError
                } else if msg.contains("timeout") {
                    Self::Timeout
                } else {
                    Self::Unknown
                }
            }
            _ if msg.contains("pool timed out") || msg.contains("acquire") => {
                Self::ConnectionError
            }
            _ => Self::Unknown,
        }
    }

    /// Check if the failed transaction can be replayed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SerializationFailure)
    }

    /// Check if the database itself is unreachable or overloaded
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ConnectionError | Self::Timeout)
    }
}

fn is_serialization_message(msg: &str) -> bool {
    // PostgreSQL SQLSTATE 40001 / 40P01, SQLite SQLITE_BUSY / SQLITE_LOCKED
    msg.contains("could not serialize access")
        || msg.contains("40001")
        || msg.contains("40p01")
        || msg.contains("deadlock")
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
        || msg.contains("database is busy")
}
