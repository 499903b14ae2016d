pub mod model_version;
pub mod registered_model;

use sea_orm::DbErr;
use serde::{de::DeserializeOwned, Serialize};

/// Tags and labels are stored as JSON text so the schema stays portable
/// between PostgreSQL and SQLite.
pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, DbErr> {
    serde_json::to_string(value).map_err(|e| DbErr::Json(e.to_string()))
}

pub(crate) fn decode_json<T: DeserializeOwned + Default>(
    column: &str,
    raw: &str,
) -> Result<T, DbErr> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).map_err(|e| DbErr::Json(format!("column {}: {}", column, e)))
}

pub(crate) fn decode_enum<T>(column: &str, raw: &str) -> Result<T, DbErr>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse()
        .map_err(|e: String| DbErr::Type(format!("column {}: {}", column, e)))
}
