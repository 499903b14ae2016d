use axum::{extract::State, http::StatusCode, response::Json};
use uuid::Uuid;

use super::model_versions::{lookup_key, LookupKey};
use crate::server::app::AppState;
use crate::server::dto::{ListResponse, ModelArtifactResponse};
use crate::server::error::ApiError;
use crate::server::extract::{JsonBody, PathParams, ProjectId, QueryParams};
use crate::services::payloads::{
    ArtifactListQuery, CreateModelArtifact, UpdateModelVersion, VersionLookupQuery,
};

pub async fn create_artifact(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    JsonBody(payload): JsonBody<CreateModelArtifact>,
) -> Result<(StatusCode, Json<ModelArtifactResponse>), ApiError> {
    let scope = state.ctx.scope(project_id);
    let artifact = state
        .ctx
        .model_artifact_service()
        .create(&scope, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(artifact.into())))
}

pub async fn list_artifacts(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<ArtifactListQuery>,
) -> Result<Json<ListResponse<ModelArtifactResponse>>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let page = state
        .ctx
        .model_artifact_service()
        .list(&scope, &query)
        .await?;
    Ok(Json(page.map(ModelArtifactResponse::from).into()))
}

pub async fn get_artifact(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<ModelArtifactResponse>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let artifact = state.ctx.model_artifact_service().get(&scope, id).await?;
    Ok(Json(artifact.into()))
}

pub async fn find_artifact(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    QueryParams(query): QueryParams<VersionLookupQuery>,
) -> Result<Json<ModelArtifactResponse>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let service = state.ctx.model_artifact_service();
    let artifact = match lookup_key(&query)? {
        LookupKey::Id(id) => service.get(&scope, id).await?,
        LookupKey::Name { model_id, name } => service.get_by_name(&scope, model_id, name).await?,
    };
    Ok(Json(artifact.into()))
}

pub async fn update_artifact(
    State(state): State<AppState>,
    ProjectId(project_id): ProjectId,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UpdateModelVersion>,
) -> Result<Json<ModelArtifactResponse>, ApiError> {
    let scope = state.ctx.scope(project_id);
    let artifact = state
        .ctx
        .model_artifact_service()
        .update(&scope, id, payload)
        .await?;
    Ok(Json(artifact.into()))
}
