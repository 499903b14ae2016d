use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{decode_enum, decode_json};
use crate::domain::{RegisteredModel, VersionSummary};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registered_model")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub model_type: Option<String>,
    pub region_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub tags: String, // JSON object of ordered arrays
    #[sea_orm(column_type = "Text")]
    pub labels: String, // JSON object
    pub state: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub deleted_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::model_version::Entity")]
    ModelVersions,
}

impl Related<super::model_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModelVersions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RegisteredModel {
    type Error = DbErr;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(RegisteredModel {
            state: decode_enum("registered_model.state", &model.state)?,
            tags: decode_json("registered_model.tags", &model.tags)?,
            labels: decode_json("registered_model.labels", &model.labels)?,
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            description: model.description,
            model_type: model.model_type,
            region_id: model.region_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            versions: VersionSummary::default(),
        })
    }
}
