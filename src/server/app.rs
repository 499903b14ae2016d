use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    http::{HeaderValue, Method, Request},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use super::handlers::{health, model_artifacts, model_versions, registered_models};
use crate::app_context::AppContext;

pub const API_BASE_PATH: &str = "/api/v1/model-registry";

#[derive(Clone)]
pub struct AppState {
    pub ctx: AppContext,
}

pub fn create_app(ctx: AppContext, cors_origin: Option<&str>) -> Result<Router> {
    let state = AppState { ctx };

    let origin = match cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .map_err(|e| anyhow!("invalid CORS origin '{}': {}", origin, e))?,
        ),
        None => CorsLayer::new().allow_origin(Any),
    };
    let cors = origin
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    let app = Router::new()
        .route("/healthz", get(health::health_check))
        .nest(API_BASE_PATH, api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Registered models
        .route(
            "/models",
            get(registered_models::list_models).post(registered_models::create_model),
        )
        .route(
            "/models/:id",
            get(registered_models::get_model)
                .patch(registered_models::update_model)
                .delete(registered_models::delete_model),
        )
        .route("/model", get(registered_models::find_model))
        // Versions nested under their model
        .route(
            "/models/:id/versions",
            get(model_versions::list_model_versions).post(model_versions::create_version),
        )
        .route(
            "/models/:id/versions/:version_id",
            get(model_versions::get_model_version).patch(model_versions::update_model_version),
        )
        // Flat version routes
        .route("/model_versions", get(model_versions::list_versions))
        .route(
            "/model_versions/:id",
            get(model_versions::get_version).patch(model_versions::update_version),
        )
        .route("/model_version", get(model_versions::find_version))
        // Artifact projection
        .route(
            "/model_artifacts",
            get(model_artifacts::list_artifacts).post(model_artifacts::create_artifact),
        )
        .route(
            "/model_artifacts/:id",
            get(model_artifacts::get_artifact).patch(model_artifacts::update_artifact),
        )
        .route("/model_artifact", get(model_artifacts::find_artifact))
}
