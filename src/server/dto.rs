use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ArtifactType, ModelState, ModelVersion, Page};

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page_size: u64,
    pub next_offset: u64,
}

impl<T> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        let next_offset = page.next_offset();
        Self {
            items: page.items,
            total: page.total,
            page_size: page.limit,
            next_offset,
        }
    }
}

/// Columns of a version that make sense for an artifact. Readiness and the
/// default flag stay on the version view.
#[derive(Debug, Serialize)]
pub struct ModelArtifactResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub registered_model_id: Uuid,
    pub name: String,
    pub uri: String,
    pub artifact_type: ArtifactType,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub state: ModelState,
    pub labels: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ModelVersion> for ModelArtifactResponse {
    fn from(version: ModelVersion) -> Self {
        Self {
            id: version.id,
            project_id: version.project_id,
            registered_model_id: version.registered_model_id,
            name: version.name,
            uri: version.uri,
            artifact_type: version.artifact_type,
            model_framework: version.model_framework,
            model_framework_version: version.model_framework_version,
            container_image: version.container_image,
            state: version.state,
            labels: version.labels,
            created_at: version.created_at,
            updated_at: version.updated_at,
        }
    }
}
