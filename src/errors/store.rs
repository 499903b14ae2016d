//! Store error types
//!
//! Errors produced by the repositories. Driver errors are classified on
//! conversion so callers never have to inspect `sea_orm::DbErr` themselves.

use sea_orm::DbErr;
use thiserror::Error;

use crate::common::db_errors::DbErrorKind;
use crate::domain::PatchRejection;

/// Repository operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Addressed row is absent, soft-deleted or owned by another project
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unique index rejected the write
    #[error("duplicate {0}")]
    Duplicate(String),

    /// Row changed since the caller last read it
    #[error("{0} was modified concurrently")]
    Stale(&'static str),

    /// Payload rejected before reaching the database
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Row exists but is in the wrong state for the operation
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Caller canceled the request or its deadline passed
    #[error("operation canceled")]
    Canceled,

    /// Database unreachable, or retry budget exhausted
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization failure; the transaction may be replayed
    #[error("retryable transaction failure: {0}")]
    Retryable(#[source] DbErr),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[source] DbErr),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable(_))
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        let kind = DbErrorKind::from_db_err(&err);
        if kind == DbErrorKind::UniqueViolation {
            StoreError::Duplicate(err.to_string())
        } else if kind.is_retryable() {
            StoreError::Retryable(err)
        } else if kind.is_unavailable() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}

impl From<PatchRejection> for StoreError {
    fn from(rejection: PatchRejection) -> Self {
        match rejection {
            PatchRejection::Invalid(msg) => StoreError::Invalid(msg),
            PatchRejection::Precondition(msg) => StoreError::PreconditionFailed(msg),
        }
    }
}
