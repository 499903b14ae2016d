use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

const PARTIAL_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_registered_model_project_name \
     ON registered_model (project_id, name) WHERE deleted_at IS NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_model_version_project_model_name \
     ON model_version (project_id, registered_model_id, name) WHERE deleted_at IS NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_model_version_single_default \
     ON model_version (project_id, registered_model_id) \
     WHERE is_default AND deleted_at IS NULL AND state = 'ACTIVE'",
];

const PG_UPDATED_AT_FUNCTION: &str = r#"
CREATE OR REPLACE FUNCTION registry_advance_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at := GREATEST(NEW.updated_at, now(), OLD.updated_at + interval '1 microsecond');
    RETURN NEW;
END;
$$ LANGUAGE plpgsql
"#;

const PG_UPDATED_AT_TRIGGERS: [&str; 2] = [
    "CREATE TRIGGER trg_registered_model_updated_at BEFORE UPDATE ON registered_model \
     FOR EACH ROW EXECUTE FUNCTION registry_advance_updated_at()",
    "CREATE TRIGGER trg_model_version_updated_at BEFORE UPDATE ON model_version \
     FOR EACH ROW EXECUTE FUNCTION registry_advance_updated_at()",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RegisteredModel::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RegisteredModel::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RegisteredModel::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(RegisteredModel::Name).string_len(255).not_null())
                    .col(ColumnDef::new(RegisteredModel::Description).text())
                    .col(ColumnDef::new(RegisteredModel::ModelType).string_len(64))
                    .col(ColumnDef::new(RegisteredModel::RegionId).uuid())
                    .col(
                        ColumnDef::new(RegisteredModel::Tags)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(RegisteredModel::Labels)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(RegisteredModel::State)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(RegisteredModel::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RegisteredModel::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RegisteredModel::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModelVersion::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModelVersion::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ModelVersion::ProjectId).uuid().not_null())
                    .col(
                        ColumnDef::new(ModelVersion::RegisteredModelId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModelVersion::Name).string_len(255).not_null())
                    .col(ColumnDef::new(ModelVersion::Uri).text().not_null())
                    .col(ColumnDef::new(ModelVersion::ModelFramework).string())
                    .col(ColumnDef::new(ModelVersion::ModelFrameworkVersion).string())
                    .col(ColumnDef::new(ModelVersion::ContainerImage).string())
                    .col(
                        ColumnDef::new(ModelVersion::ArtifactType)
                            .string_len(32)
                            .not_null()
                            .default("model"),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::IsArtifact)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::State)
                            .string_len(16)
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::Labels)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ModelVersion::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModelVersion::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_model_version_registered_model_id")
                            .from(ModelVersion::Table, ModelVersion::RegisteredModelId)
                            .to(RegisteredModel::Table, RegisteredModel::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registered_model_project_created")
                    .table(RegisteredModel::Table)
                    .col(RegisteredModel::ProjectId)
                    .col(RegisteredModel::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_model_version_project_created")
                    .table(ModelVersion::Table)
                    .col(ModelVersion::ProjectId)
                    .col(ModelVersion::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // sea-query has no portable partial index builder
        let db = manager.get_connection();
        for statement in PARTIAL_INDEXES {
            db.execute_unprepared(statement).await?;
        }

        if manager.get_database_backend() == DatabaseBackend::Postgres {
            db.execute_unprepared(PG_UPDATED_AT_FUNCTION).await?;
            for statement in PG_UPDATED_AT_TRIGGERS {
                db.execute_unprepared(statement).await?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModelVersion::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RegisteredModel::Table).if_exists().to_owned())
            .await?;

        if manager.get_database_backend() == DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared("DROP FUNCTION IF EXISTS registry_advance_updated_at()")
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum RegisteredModel {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    ModelType,
    RegionId,
    Tags,
    Labels,
    State,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ModelVersion {
    Table,
    Id,
    ProjectId,
    RegisteredModelId,
    Name,
    Uri,
    ModelFramework,
    ModelFrameworkVersion,
    ContainerImage,
    ArtifactType,
    IsArtifact,
    IsDefault,
    Status,
    State,
    Labels,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
