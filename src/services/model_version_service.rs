use sea_orm::DatabaseConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::payloads::{CreateModelVersion, UpdateModelVersion, VersionListQuery};
use super::ValidationService;
use crate::domain::{
    ArtifactType, ModelVersion, ModelVersionFilter, ModelVersionPatch, NewModelVersion, Page,
};
use crate::errors::{CoreError, CoreResult};
use crate::store::{ModelVersionRepository, RegisteredModelRepository, RequestScope};

pub struct ModelVersionService {
    models: RegisteredModelRepository,
    versions: ModelVersionRepository,
}

impl ModelVersionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            models: RegisteredModelRepository::new(db.clone()),
            versions: ModelVersionRepository::new(db),
        }
    }

    /// Creates a version under `registered_model_id`. When the body also
    /// names a parent it must agree with the path.
    #[instrument(skip_all, fields(project_id = %scope.project_id(), %registered_model_id))]
    pub async fn create(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        payload: CreateModelVersion,
    ) -> CoreResult<ModelVersion> {
        if let Some(raw) = payload.registered_model_id.as_deref() {
            let body_parent = ValidationService::parse_uuid("registered_model_id", raw)?;
            if body_parent != registered_model_id {
                return Err(CoreError::invalid_field(
                    "registered_model_id",
                    "registered_model_id does not match the path",
                ));
            }
        }

        let artifact_type = match payload.artifact_type.as_deref() {
            Some(raw) => ValidationService::parse_artifact_type(raw)?,
            None => ArtifactType::Model,
        };
        let input = NewModelVersion {
            registered_model_id,
            name: ValidationService::validate_name("name", &payload.name)?,
            uri: ValidationService::required_string("uri", &payload.uri)?,
            model_framework: ValidationService::optional_string(payload.model_framework.as_deref()),
            model_framework_version: ValidationService::optional_string(
                payload.model_framework_version.as_deref(),
            ),
            container_image: ValidationService::optional_string(payload.container_image.as_deref()),
            artifact_type,
            is_default: payload.is_default.unwrap_or(false),
            labels: payload.labels.unwrap_or_default(),
        };

        let version = self.versions.create(scope, &input).await?;
        info!(
            id = %version.id,
            name = %version.name,
            is_default = version.is_default,
            "model version created"
        );
        Ok(version)
    }

    pub async fn get(&self, scope: &RequestScope, id: Uuid) -> CoreResult<ModelVersion> {
        Ok(self.versions.get_by_id(scope, id).await?)
    }

    /// Nested lookup; a version of another model reads as missing.
    pub async fn get_for_model(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        id: Uuid,
    ) -> CoreResult<ModelVersion> {
        let version = self.versions.get_by_id(scope, id).await?;
        if version.registered_model_id != registered_model_id {
            return Err(CoreError::not_found("model_version", id.to_string()));
        }
        Ok(version)
    }

    pub async fn get_by_name(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        name: &str,
    ) -> CoreResult<ModelVersion> {
        let name = ValidationService::required_string("name", name)?;
        Ok(self
            .versions
            .get_by_name(scope, registered_model_id, &name)
            .await?)
    }

    pub async fn list_by_model(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        query: &VersionListQuery,
    ) -> CoreResult<Page<ModelVersion>> {
        // A missing parent is a 404, not an empty page.
        self.models.get_by_id(scope, registered_model_id).await?;

        let filter = version_filter(query)?;
        let page = ValidationService::pagination(query.limit, query.offset);
        Ok(self
            .versions
            .list_by_model(scope, registered_model_id, &filter, page)
            .await?)
    }

    pub async fn list(
        &self,
        scope: &RequestScope,
        query: &VersionListQuery,
    ) -> CoreResult<Page<ModelVersion>> {
        let filter = ModelVersionFilter {
            registered_model_id: ValidationService::parse_optional_uuid(
                "registered_model_id",
                query.registered_model_id.as_deref(),
            )?,
            ..version_filter(query)?
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
        let expected_updated_at = payload.expected_updated_at;
        let patch = version_patch(payload)?;
        let version = self
            .versions
            .update(scope, id, &patch, expected_updated_at)
            .await?;
        info!(
            status = %version.status,
            state = %version.state,
            is_default = version.is_default,
            "model version updated"
        );
        Ok(version)
    }

    pub async fn update_for_model(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        id: Uuid,
        payload: UpdateModelVersion,
    ) -> CoreResult<ModelVersion> {
        self.get_for_model(scope, registered_model_id, id).await?;
        self.update(scope, id, payload).await
    }
}

fn version_filter(query: &VersionListQuery) -> CoreResult<ModelVersionFilter> {
    Ok(ModelVersionFilter {
        registered_model_id: None,
        is_artifact: None,
        name: ValidationService::optional_string(query.name.as_deref()),
        state: query
            .state
            .as_deref()
            .map(ValidationService::parse_state)
            .transpose()?,
        status: query
            .status
            .as_deref()
            .map(ValidationService::parse_status)
            .transpose()?,
        sort: ValidationService::sorting(query.sort_by.as_deref(), query.order.as_deref())?,
    })
}

/// Shared with the artifact service, which strips `status` and
/// `is_default` first.
pub(crate) fn version_patch(payload: UpdateModelVersion) -> CoreResult<ModelVersionPatch> {
    Ok(ModelVersionPatch {
        uri: payload
            .uri
            .as_deref()
            .map(|uri| ValidationService::required_string("uri", uri))
            .transpose()?,
        model_framework: payload
            .model_framework
            .map(|v| ValidationService::optional_string(Some(v.as_str()))),
        model_framework_version: payload
            .model_framework_version
            .map(|v| ValidationService::optional_string(Some(v.as_str()))),
        container_image: payload
            .container_image
            .map(|v| ValidationService::optional_string(Some(v.as_str()))),
        labels: payload.labels,
        status: payload
            .status
            .as_deref()
            .map(ValidationService::parse_status)
            .transpose()?,
        state: payload
            .state
            .as_deref()
            .map(ValidationService::parse_state)
            .transpose()?,
        is_default: payload.is_default,
    })
}
