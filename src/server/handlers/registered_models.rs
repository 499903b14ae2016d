use axum::{extract::State, http::StatusCode, response::Json};
use uuid::Uuid;

use crate::domain::RegisteredModel;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::dto::ListResponse;
use crate::server::error::ApiError;
use crate::server::extract::{JsonBody, PathParams, ProjectId, QueryParams};
use crate::services::payloads::{
    CreateRegisteredModel, ModelListQuery, ModelLookupQuery, UpdateRegisteredModel,
};
use crate::services::ValidationService;

pub async fn create_model(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    JsonBody(payload): JsonBody<CreateRegisteredModel>,
) -> Result<(StatusCode, Json<RegisteredModel>), ApiError> {
    let scope = state.ctx.scope(project_id);
    let model = state
        .ctx
        .registered_model_service()
        .create(&scope, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(model)))
}

pub async fn list_models(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<ModelListQuery>,
) -> Result<Json<ListResponse<RegisteredModel>>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let page = state
        .ctx
        .registered_model_service()
        .list(&scope, &query)
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_model(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<RegisteredModel>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let model = state.ctx.registered_model_service().get(&scope, id).await?;
    Ok(Json(model))
}

/// `GET /model?name=` or `GET /model?externalId=`.
pub async fn find_model(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<ModelLookupQuery>,
) -> Result<Json<RegisteredModel>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let service = state.ctx.registered_model_service();
    let model = match (query.external_id.as_deref(), query.name.as_deref()) {
        (Some(raw), _) => {
            let id = ValidationService::parse_uuid("externalId", raw)?;
            service.get(&scope, id).await?
        }
        (None, Some(name)) => service.get_by_name(&scope, name).await?,
        (None, None) => {
            return Err(CoreError::invalid("either name or externalId is required").into())
        }
    };
    Ok(Json(model))
}

pub async fn update_model(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateRegisteredModel>,
) -> Result<Json<RegisteredModel>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let model = state
        .ctx
        .registered_model_service()
        .update(&scope, id, payload)
        .await?;
    Ok(Json(model))
}

pub async fn delete_model(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
) -> Result<StatusCode, ApiError> {
    let scope = state.ctx.scope(project_id);
    state
        .ctx
        .registered_model_service()
        .delete(&scope, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
