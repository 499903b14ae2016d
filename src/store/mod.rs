//! Persistence for registered models and their versions.
//!
//! The repositories are the only code that issues SQL. Every query is
//! scoped to the caller's project and ignores soft-deleted rows.

pub mod model_version_repo;
pub mod registered_model_repo;
pub mod retry;
pub mod scope;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, Order, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr,
    IsolationLevel, TransactionTrait,
};

use crate::domain::SortOrder;

pub use model_version_repo::ModelVersionRepository;
pub use registered_model_repo::RegisteredModelRepository;
pub use retry::with_retry;
pub use scope::{CancelHandle, RequestScope};

/// Current time at the resolution PostgreSQL stores.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a row last written at `previous`; always strictly later.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    now_micros().max(previous + Duration::microseconds(1))
}

/// Case-insensitive substring match. `%`, `_` and `\` in `needle` match
/// themselves.
pub(crate) fn name_contains<C: ColumnTrait>(column: C, needle: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

pub(crate) fn sql_order(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Opens a SERIALIZABLE transaction on PostgreSQL. SQLite already
/// serializes writers and rejects isolation settings.
pub(crate) async fn begin_serializable(
    db: &DatabaseConnection,
) -> Result<DatabaseTransaction, DbErr> {
    let isolation = match db.get_database_backend() {
        DatabaseBackend::Postgres => Some(IsolationLevel::Serializable),
        _ => None,
    };
    db.begin_with_config(isolation, None).await
}
