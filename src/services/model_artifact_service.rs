//! Artifact view over model versions.
//!
//! There is no artifact table: an artifact is a version whose
//! `artifact_type` is anything but `model`. This service narrows the
//! version operations to that projection and refuses the fields that only
//! make sense for deployable versions.

use sea_orm::DatabaseConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::model_version_service::version_patch;
use super::payloads::{ArtifactListQuery, CreateModelArtifact, UpdateModelVersion};
use super::ValidationService;
use crate::domain::{ArtifactType, ModelVersion, ModelVersionFilter, NewModelVersion, Page};
use crate::errors::{CoreError, CoreResult};
use crate::store::{ModelVersionRepository, RequestScope};

pub struct ModelArtifactService {
    versions: ModelVersionRepository,
}

impl ModelArtifactService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            versions: ModelVersionRepository::new(db),
        }
    }

    #[instrument(skip_all, fields(project_id = %scope.project_id()))]
    pub async fn create(
        &self,
        scope: &RequestScope,
        payload: CreateModelArtifact,
    ) -> CoreResult<ModelVersion> {
        let artifact_type = match payload.artifact_type.as_deref() {
            Some(raw) => ValidationService::parse_artifact_type(raw)?,
            None => ArtifactType::Other,
        };
        if !artifact_type.is_artifact() {
            return Err(CoreError::invalid_field(
                "artifact_type",
                "artifact_type 'model' is not an artifact; create a model version instead",
            ));
        }

        let input = NewModelVersion {
            registered_model_id: ValidationService::parse_uuid(
                "registered_model_id",
                &payload.registered_model_id,
            )?,
            name: ValidationService::validate_name("name", &payload.name)?,
            uri: ValidationService::required_string("uri", &payload.uri)?,
            model_framework: ValidationService::optional_string(payload.model_framework.as_deref()),
            model_framework_version: ValidationService::optional_string(
                payload.model_framework_version.as_deref(),
            ),
            container_image: ValidationService::optional_string(payload.container_image.as_deref()),
            artifact_type,
            is_default: false,
            labels: payload.labels.unwrap_or_default(),
        };

        let artifact = self.versions.create(scope, &input).await?;
        info!(id = %artifact.id, artifact_type = %artifact.artifact_type, "model artifact created");
        Ok(artifact)
    }

    pub async fn get(&self, scope: &RequestScope, id: Uuid) -> CoreResult<ModelVersion> {
        let version = self.versions.get_by_id(scope, id).await?;
        only_artifact(version)
    }

    pub async fn get_by_name(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        name: &str,
    ) -> CoreResult<ModelVersion> {
        let name = ValidationService::required_string("name", name)?;
        let version = self
            .versions
            .get_by_name(scope, registered_model_id, &name)
            .await?;
        only_artifact(version)
    }

    pub async fn list(
        &self,
        scope: &RequestScope,
        query: &ArtifactListQuery,
    ) -> CoreResult<Page<ModelVersion>> {
        let filter = ModelVersionFilter {
            registered_model_id: ValidationService::parse_optional_uuid(
                "registered_model_id",
                query.registered_model_id.as_deref(),
            )?,
            is_artifact: Some(true),
            name: ValidationService::optional_string(query.name.as_deref()),
            state: query
                .state
                .as_deref()
                .map(ValidationService::parse_state)
                .transpose()?,
            status: None,
            sort: ValidationService::sorting(query.sort_by.as_deref(), query.order.as_deref())?,
        };
        let page = ValidationService::pagination(query.limit, query.offset);
        Ok(self.versions.list_all(scope, &filter, page).await?)
    }

    #[instrument(skip_all, fields(project_id = %scope.project_id(), %id))]
    pub async fn update(
        &self,
        scope: &RequestScope,
        id: Uuid,
        payload: UpdateModelVersion,
    ) -> CoreResult<ModelVersion> {
        if payload.status.is_some() {
            return Err(CoreError::invalid_field(
                "status",
                "status cannot be set on a model artifact",
            ));
        }
        if payload.is_default.is_some() {
            return Err(CoreError::invalid_field(
                "is_default",
                "is_default cannot be set on a model artifact",
            ));
        }

        self.get(scope, id).await?;

        let expected_updated_at = payload.expected_updated_at;
        let patch = version_patch(payload)?;
        let artifact = self
            .versions
            .update(scope, id, &patch, expected_updated_at)
            .await?;
        info!(state = %artifact.state, "model artifact updated");
        Ok(artifact)
    }
}

fn only_artifact(version: ModelVersion) -> CoreResult<ModelVersion> {
    if !version.is_artifact {
        return Err(CoreError::not_found("model_artifact", version.id.to_string()));
    }
    Ok(version)
}
