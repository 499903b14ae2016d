//! Request payloads accepted by the services.
//!
//! Fields arrive as loosely typed JSON or query values. The services run
//! them through [`ValidationService`](super::ValidationService) before
//! anything reaches the store. Bodies reject unknown fields, so a `name`
//! or `status` on a model patch fails instead of being ignored.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub type RawTags = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRegisteredModel {
    pub name: String,
    pub description: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<String>,
    pub tags: Option<RawTags>,
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRegisteredModel {
    pub description: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<String>,
    pub tags: Option<RawTags>,
    pub labels: Option<BTreeMap<String, String>>,
    pub state: Option<String>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateModelVersion {
    /// Taken from the path on nested routes.
    pub registered_model_id: Option<String>,
    pub name: String,
    pub uri: String,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub artifact_type: Option<String>,
    pub is_default: Option<bool>,
    pub labels: Option<BTreeMap<String, String>>,
}

/// Patch body for versions and artifacts. Artifacts refuse `status` and
/// `is_default`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateModelVersion {
    pub uri: Option<String>,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub is_default: Option<bool>,
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateModelArtifact {
    pub registered_model_id: String,
    pub name: String,
    pub uri: String,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub artifact_type: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ModelListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VersionListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub registered_model_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArtifactListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub registered_model_id: Option<String>,
}

/// `GET /model`: exactly one of `name` or `externalId`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ModelLookupQuery {
    pub name: Option<String>,
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
}

/// `GET /model_version` and `GET /model_artifact`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct VersionLookupQuery {
    pub name: Option<String>,
    pub registered_model_id: Option<String>,
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
}
