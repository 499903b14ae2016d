use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::services::{ModelArtifactService, ModelVersionService, RegisteredModelService};
use crate::store::RequestScope;

/// Shared application context exposing the registry services to the HTTP layer.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    request_timeout: Option<Duration>,
    registered_model_service: Arc<RegisteredModelService>,
    model_version_service: Arc<ModelVersionService>,
    model_artifact_service: Arc<ModelArtifactService>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection) -> Self {
        let registered_model_service = Arc::new(RegisteredModelService::new(db.clone()));
        let model_version_service = Arc::new(ModelVersionService::new(db.clone()));
        let model_artifact_service = Arc::new(ModelArtifactService::new(db.clone()));

        Self {
            db,
            request_timeout: None,
            registered_model_service,
            model_version_service,
            model_artifact_service,
        }
    }

    /// Every scope built afterwards carries a deadline `timeout` from its creation.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn scope(&self, project_id: Uuid) -> RequestScope {
        let scope = RequestScope::new(project_id);
        match self.request_timeout {
            Some(timeout) => scope.with_timeout(timeout),
            None => scope,
        }
    }

    pub fn registered_model_service(&self) -> Arc<RegisteredModelService> {
        self.registered_model_service.clone()
    }

    pub fn model_version_service(&self) -> Arc<ModelVersionService> {
        self.model_version_service.clone()
    }

    pub fn model_artifact_service(&self) -> Arc<ModelArtifactService> {
        self.model_artifact_service.clone()
    }
}
