//! Error types for the model registry
//!
//! Two layers of errors exist:
//!
//! - **StoreError**: what the repositories report, with database driver
//!   errors already classified (duplicate key, retryable, unavailable).
//! - **CoreError**: the domain taxonomy services return and the HTTP layer
//!   maps onto status codes. Driver messages never reach it as text; they
//!   are kept as the error source for logging only.
//!
//! # Examples
//!
//! ```rust
//! use model_registry::errors::{CoreError, CoreErrorKind, StoreError};
//!
//! let err: CoreError = StoreError::Duplicate("registered_model".to_string()).into();
//! assert_eq!(err.kind(), CoreErrorKind::AlreadyExists);
//! ```

pub mod core_error;
pub mod store;

pub use core_error::{CoreError, CoreErrorKind};
pub use store::StoreError;

/// Result type alias for service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(entity) => {
                CoreError::new(CoreErrorKind::NotFound, format!("{} not found", entity))
            }
            StoreError::Duplicate(_) => {
                CoreError::already_exists("a record with this name already exists")
            }
            StoreError::Stale(entity) => CoreError::conflict(format!(
                "{} was modified since it was read",
                entity
            )),
            StoreError::Invalid(msg) => CoreError::invalid(msg),
            StoreError::PreconditionFailed(msg) => CoreError::precondition_failed(msg),
            StoreError::Canceled => CoreError::canceled("request canceled"),
            StoreError::Unavailable(msg) => {
                CoreError::unavailable("store unavailable").with_source(StoreError::Unavailable(msg))
            }
            err @ StoreError::Retryable(_) => {
                CoreError::unavailable("store unavailable").with_source(err)
            }
            err @ StoreError::Database(_) => CoreError::internal("database error").with_source(err),
        }
    }
}
