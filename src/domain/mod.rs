//! Registry domain types
//!
//! Typed views of the two persisted entities plus the inputs, patches and
//! filters the services hand to the store. Closed enumerations live in
//! [`enums`]; the taxonomy tag mapping in [`tags`].

pub mod enums;
pub mod pagination;
pub mod tags;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub use enums::{ArtifactType, ModelState, VersionStatus};
pub use pagination::{
    Page, Pagination, SortField, SortOrder, Sorting, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use tags::{Labels, Tags, TAG_KEYS};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegisteredModel {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<Uuid>,
    pub tags: Tags,
    pub labels: Labels,
    pub state: ModelState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub versions: VersionSummary,
}

/// The model's live versions as seen from a model read. List pages only
/// fill in the count.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct VersionSummary {
    pub version_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<ModelVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_version: Option<ModelVersion>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewRegisteredModel {
    pub name: String,
    pub description: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<Uuid>,
    pub tags: Tags,
    pub labels: Labels,
}

/// Fields a registered model update may touch. `None` leaves the column
/// alone; `Some(None)` clears a nullable one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisteredModelPatch {
    pub description: Option<Option<String>>,
    pub model_type: Option<String>,
    pub region_id: Option<Uuid>,
    pub tags: Option<Tags>,
    pub labels: Option<Labels>,
    pub state: Option<ModelState>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegisteredModelFilter {
    /// Case-insensitive substring match on the name.
    pub name: Option<String>,
    pub state: Option<ModelState>,
    pub model_type: Option<String>,
    pub region_id: Option<Uuid>,
    pub sort: Sorting,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelVersion {
    pub id: Uuid,
    pub project_id: Uuid,
    pub registered_model_id: Uuid,
    pub name: String,
    pub uri: String,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub artifact_type: ArtifactType,
    pub is_artifact: bool,
    pub is_default: bool,
    pub status: VersionStatus,
    pub state: ModelState,
    pub labels: Labels,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewModelVersion {
    pub registered_model_id: Uuid,
    pub name: String,
    pub uri: String,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub artifact_type: ArtifactType,
    pub is_default: bool,
    pub labels: Labels,
}

/// Fields a version update may touch, with the same `None` / `Some(None)`
/// convention as [`RegisteredModelPatch`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelVersionPatch {
    pub uri: Option<String>,
    pub model_framework: Option<Option<String>>,
    pub model_framework_version: Option<Option<String>>,
    pub container_image: Option<Option<String>>,
    pub labels: Option<Labels>,
    pub status: Option<VersionStatus>,
    pub state: Option<ModelState>,
    pub is_default: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelVersionFilter {
    pub registered_model_id: Option<Uuid>,
    pub is_artifact: Option<bool>,
    /// Case-insensitive substring match on the name.
    pub name: Option<String>,
    pub state: Option<ModelState>,
    pub status: Option<VersionStatus>,
    pub sort: Sorting,
}

/// Why a patch cannot apply to the row it targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchRejection {
    /// The patch itself is malformed for this row.
    Invalid(String),
    /// The row is in a state that forbids the change.
    Precondition(String),
}

impl RegisteredModel {
    /// Archived models keep their taxonomy frozen unless the same patch
    /// brings them back to ACTIVE.
    pub fn check_patch(&self, patch: &RegisteredModelPatch) -> Result<(), PatchRejection> {
        let unarchiving = patch.state == Some(ModelState::Active);
        if self.state == ModelState::Archived && patch.tags.is_some() && !unarchiving {
            return Err(PatchRejection::Precondition(
                "tags of an archived registered model cannot change".to_string(),
            ));
        }
        Ok(())
    }
}

impl ModelVersion {
    pub fn check_patch(&self, patch: &ModelVersionPatch) -> Result<(), PatchRejection> {
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(PatchRejection::Invalid(format!(
                    "status cannot change from {} to {}",
                    self.status, next
                )));
            }
        }
        if patch.is_default == Some(true) && self.state_after(patch) == ModelState::Archived {
            return Err(PatchRejection::Precondition(
                "an archived version cannot be the default".to_string(),
            ));
        }
        Ok(())
    }

    pub fn state_after(&self, patch: &ModelVersionPatch) -> ModelState {
        patch.state.unwrap_or(self.state)
    }
}
