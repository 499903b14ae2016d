use axum::{extract::State, http::StatusCode, response::Json};
use uuid::Uuid;

use crate::domain::ModelVersion;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::dto::ListResponse;
use crate::server::error::ApiError;
use crate::server::extract::{JsonBody, PathParams, ProjectId, QueryParams};
use crate::services::payloads::{
    CreateModelVersion, UpdateModelVersion, VersionListQuery, VersionLookupQuery,
};
use crate::services::ValidationService;

pub async fn create_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(model_id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<CreateModelVersion>,
) -> Result<(StatusCode, Json<ModelVersion>), ApiError> {
    let scope = state.ctx.scope(project_id);
    let version = state
        .ctx
        .model_version_service()
        .create(&scope, model_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn list_model_versions(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(model_id): PathParams<Uuid>,
    QueryParams(query): QueryParams<VersionListQuery>,
) -> Result<Json<ListResponse<ModelVersion>>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let page = state
        .ctx
        .model_version_service()
        .list_by_model(&scope, model_id, &query)
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_model_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams((model_id, id)): PathParams<(Uuid, Uuid)>,
) -> Result<Json<ModelVersion>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let version = state
        .ctx
        .model_version_service()
        .get_for_model(&scope, model_id, id)
        .await?;
    Ok(Json(version))
}

pub async fn update_model_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams((model_id, id)): PathParams<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<UpdateModelVersion>,
) -> Result<Json<ModelVersion>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let version = state
        .ctx
        .model_version_service()
        .update_for_model(&scope, model_id, id, payload)
        .await?;
    Ok(Json(version))
}

pub async fn list_versions(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<VersionListQuery>,
) -> Result<Json<ListResponse<ModelVersion>>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let page = state
        .ctx
        .model_version_service()
        .list(&scope, &query)
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<ModelVersion>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let version = state.ctx.model_version_service().get(&scope, id).await?;
    Ok(Json(version))
}

/// `GET /model_version?name=&registered_model_id=` or `?externalId=`.
pub async fn find_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<VersionLookupQuery>,
) -> Result<Json<ModelVersion>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let service = state.ctx.model_version_service();
    let version = match lookup_key(&query)? {
        LookupKey::Id(id) => service.get(&scope, id).await?,
        LookupKey::Name { model_id, name } => service.get_by_name(&scope, model_id, name).await?,
    };
    Ok(Json(version))
}

pub async fn update_version(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateModelVersion>,
) -> Result<Json<ModelVersion>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let version = state
        .ctx
        .model_version_service()
        .update(&scope, id, payload)
        .await?;
    Ok(Json(version))
}

pub(crate) enum LookupKey<'a> {
    Id(Uuid),
    Name { model_id: Uuid, name: &'a str },
}

/// Resolves a version or artifact lookup query. `externalId` wins when
/// both forms are present.
pub(crate) fn lookup_key(query: &VersionLookupQuery) -> Result<LookupKey<'_>, CoreError> {
    if let Some(raw) = query.external_id.as_deref() {
        return Ok(LookupKey::Id(ValidationService::parse_uuid("externalId", raw)?));
    }
    match (query.name.as_deref(), query.registered_model_id.as_deref()) {
        (Some(name), Some(raw_model_id)) => Ok(LookupKey::Name {
            model_id: ValidationService::parse_uuid("registered_model_id", raw_model_id)?,
            name,
        }),
        (Some(_), None) => Err(CoreError::invalid_field(
            "registered_model_id",
            "registered_model_id is required with name",
        )),
        (None, _) => Err(CoreError::invalid(
            "either name with registered_model_id or externalId is required",
        )),
    }
}
