use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{decode_enum, decode_json};
use crate::domain::ModelVersion;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "model_version")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub registered_model_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub uri: String,
    pub model_framework: Option<String>,
    pub model_framework_version: Option<String>,
    pub container_image: Option<String>,
    pub artifact_type: String,
    pub is_artifact: bool,
    pub is_default: bool,
    pub status: String,
    pub state: String,
    #[sea_orm(column_type = "Text")]
    pub labels: String, // JSON object
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub deleted_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::registered_model::Entity",
        from = "Column::RegisteredModelId",
        to = "super::registered_model::Column::Id"
    )]
    RegisteredModel,
}

impl Related<super::registered_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RegisteredModel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ModelVersion {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(ModelVersion {
            artifact_type: decode_enum("model_version.artifact_type", &model.artifact_type)?,
            status: decode_enum("model_version.status", &model.status)?,
            state: decode_enum("model_version.state", &model.state)?,
            labels: decode_json("model_version.labels", &model.labels)?,
            id: model.id,
            project_id: model.project_id,
            registered_model_id: model.registered_model_id,
            name: model.name,
            uri: model.uri,
            model_framework: model.model_framework,
            model_framework_version: model.model_framework_version,
            container_image: model.container_image,
            is_artifact: model.is_artifact,
            is_default: model.is_default,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
