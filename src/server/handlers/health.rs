use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::database::ping;
use crate::server::app::AppState;

/// 200 while the database answers, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match ping(state.ctx.db()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "model-registry",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(err) => {
            warn!(error = %err, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "service": "model-registry",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
    }
}
