use sea_orm::DatabaseConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::payloads::{CreateRegisteredModel, ModelListQuery, UpdateRegisteredModel};
use super::ValidationService;
use crate::domain::{
    ModelState, NewRegisteredModel, Page, RegisteredModel, RegisteredModelFilter,
    RegisteredModelPatch,
};
use crate::errors::{CoreError, CoreResult};
use crate::store::{ModelVersionRepository, RegisteredModelRepository, RequestScope};

/// Lifecycle of registered models: create, patch, archive and the guarded
/// cascade delete.
pub struct RegisteredModelService {
    models: RegisteredModelRepository,
    versions: ModelVersionRepository,
}

impl RegisteredModelService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            models: RegisteredModelRepository::new(db.clone()),
            versions: ModelVersionRepository::new(db),
        }
    }

    #[instrument(skip_all, fields(project_id = %scope.project_id()))]
    pub async fn create(
        &self,
        scope: &RequestScope,
        payload: CreateRegisteredModel,
    ) -> CoreResult<RegisteredModel> {
        let input = NewRegisteredModel {
            name: ValidationService::validate_name("name", &payload.name)?,
            description: ValidationService::optional_string(payload.description.as_deref()),
            model_type: payload
                .model_type
                .as_deref()
                .map(ValidationService::validate_model_type)
                .transpose()?,
            region_id: ValidationService::parse_optional_uuid(
                "region_id",
                payload.region_id.as_deref(),
            )?,
            tags: payload
                .tags
                .as_ref()
                .map(ValidationService::validate_tags)
                .transpose()?
                .unwrap_or_default(),
            labels: payload.labels.unwrap_or_default(),
        };

        let model = self.models.create(scope, &input).await?;
        info!(id = %model.id, name = %model.name, "registered model created");
        Ok(model)
    }

    pub async fn get(&self, scope: &RequestScope, id: Uuid) -> CoreResult<RegisteredModel> {
        Ok(self.models.get_by_id(scope, id).await?)
    }

    /// Exact match on the trimmed name.
    pub async fn get_by_name(&self, scope: &RequestScope, name: &str) -> CoreResult<RegisteredModel> {
        let name = ValidationService::required_string("name", name)?;
        Ok(self.models.get_by_name(scope, &name).await?)
    }

    pub async fn list(
        &self,
        scope: &RequestScope,
        query: &ModelListQuery,
    ) -> CoreResult<Page<RegisteredModel>> {
        let filter = RegisteredModelFilter {
            name: ValidationService::optional_string(query.name.as_deref()),
            state: query
                .state
                .as_deref()
                .map(ValidationService::parse_state)
                .transpose()?,
            model_type: ValidationService::optional_string(query.model_type.as_deref()),
            region_id: ValidationService::parse_optional_uuid(
                "region_id",
                query.region_id.as_deref(),
            )?,
            sort: ValidationService::sorting(query.sort_by.as_deref(), query.order.as_deref())?,
        };
        let page = ValidationService::pagination(query.limit, query.offset);
        Ok(self.models.list(scope, &filter, page).await?)
    }

    #[instrument(skip_all, fields(project_id = %scope.project_id(), %id))]
    pub async fn update(
        &self,
        scope: &RequestScope,
        id: Uuid,
        payload: UpdateRegisteredModel,
    ) -> CoreResult<RegisteredModel> {
        let patch = RegisteredModelPatch {
            description: payload
                .description
                .map(|d| ValidationService::optional_string(Some(d.as_str()))),
            model_type: payload
                .model_type
                .as_deref()
                .map(ValidationService::validate_model_type)
                .transpose()?,
            region_id: ValidationService::parse_optional_uuid(
                "region_id",
                payload.region_id.as_deref(),
            )?,
            tags: payload
                .tags
                .as_ref()
                .map(ValidationService::validate_tags)
                .transpose()?,
            labels: payload.labels,
            state: payload
                .state
                .as_deref()
                .map(ValidationService::parse_state)
                .transpose()?,
        };

        let model = self
            .models
            .update(scope, id, &patch, payload.expected_updated_at)
            .await?;
        info!(state = %model.state, "registered model updated");
        Ok(model)
    }

    /// Deletes an archived model without READY versions, cascading to its
    /// versions. The store repeats both checks inside its transaction; the
    /// ones here only give the common failures a cheap early answer.
    #[instrument(skip_all, fields(project_id = %scope.project_id(), %id))]
    pub async fn delete(&self, scope: &RequestScope, id: Uuid) -> CoreResult<()> {
        let model = self.models.get_by_id(scope, id).await?;

        if self.versions.count_ready(scope, id).await? > 0 {
            return Err(CoreError::precondition_failed(
                "registered model has READY versions",
            ));
        }
        if model.state != ModelState::Archived {
            return Err(CoreError::precondition_failed(
                "registered model is not archived",
            ));
        }

        self.models.delete(scope, id).await?;
        info!("registered model deleted");
        Ok(())
    }
}
