//! Store and service tests
//!
//! Exercise the repositories and services directly against a migrated
//! SQLite file database: tenant scoping, the delete cascade, default-flag
//! races and request cancellation.

use anyhow::Result;
use model_registry::app_context::AppContext;
use model_registry::config::DatabaseConfig;
use model_registry::database::entities::model_version;
use model_registry::database::{establish_connection, migrations::Migrator};
use model_registry::domain::{
    ArtifactType, ModelState, ModelVersionFilter, ModelVersionPatch, NewModelVersion,
    NewRegisteredModel, Pagination, RegisteredModelFilter, RegisteredModelPatch,
};
use model_registry::errors::{CoreErrorKind, StoreError};
use model_registry::services::payloads::{
    CreateModelVersion, CreateRegisteredModel, UpdateModelVersion, UpdateRegisteredModel,
};
use model_registry::store::{
    CancelHandle, ModelVersionRepository, RegisteredModelRepository, RequestScope,
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;
use tempfile::NamedTempFile;
use uuid::Uuid;

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let db_file = NamedTempFile::new()?;
    let url = format!("sqlite://{}?mode=rwc", db_file.path().display());
    let db = establish_connection(&DatabaseConfig::from_url(url)).await?;
    Migrator::up(&db, None).await?;
    Ok((db, db_file))
}

fn new_model(name: &str) -> NewRegisteredModel {
    NewRegisteredModel {
        name: name.to_string(),
        ..Default::default()
    }
}

fn new_version(model_id: Uuid, name: &str, is_default: bool) -> NewModelVersion {
    NewModelVersion {
        registered_model_id: model_id,
        name: name.to_string(),
        uri: format!("s3://models/{}", name),
        model_framework: None,
        model_framework_version: None,
        container_image: None,
        artifact_type: ArtifactType::Model,
        is_default,
        labels: Default::default(),
    }
}

async fn model_names(
    models: &RegisteredModelRepository,
    scope: &RequestScope,
    needle: &str,
) -> Result<Vec<String>> {
    let filter = RegisteredModelFilter {
        name: Some(needle.to_string()),
        ..Default::default()
    };
    let page = models.list(scope, &filter, Pagination::default()).await?;
    Ok(page.items.into_iter().map(|model| model.name).collect())
}

fn archive() -> RegisteredModelPatch {
    RegisteredModelPatch {
        state: Some(ModelState::Archived),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_repository_tenant_isolation() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db.clone());
    let owner = RequestScope::new(Uuid::new_v4());
    let stranger = RequestScope::new(Uuid::new_v4());

    let model = models.create(&owner, &new_model("isolated")).await?;

    assert!(matches!(
        models.get_by_id(&stranger, model.id).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        models.get_by_name(&stranger, "isolated").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        models.update(&stranger, model.id, &archive(), None).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        models.delete(&stranger, model.id).await,
        Err(StoreError::NotFound(_))
    ));

    let page = models
        .list(&stranger, &RegisteredModelFilter::default(), Pagination::default())
        .await?;
    assert_eq!(page.total, 0);

    // The owner still sees an untouched ACTIVE row.
    let mine = models.get_by_id(&owner, model.id).await?;
    assert_eq!(mine.state, ModelState::Active);

    Ok(())
}

#[tokio::test]
async fn test_delete_cascades_to_versions() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db.clone());
    let versions = ModelVersionRepository::new(db.clone());
    let scope = RequestScope::new(Uuid::new_v4());

    let model = models.create(&scope, &new_model("cascade")).await?;
    let v1 = versions.create(&scope, &new_version(model.id, "v1", true)).await?;
    let v2 = versions.create(&scope, &new_version(model.id, "v2", false)).await?;

    // A row stamped ahead of the clock must still move forward.
    let ahead = v2.updated_at + chrono::Duration::hours(1);
    model_version::Entity::update_many()
        .col_expr(model_version::Column::UpdatedAt, Expr::value(ahead))
        .filter(model_version::Column::Id.eq(v2.id))
        .exec(&db)
        .await?;

    models.update(&scope, model.id, &archive(), None).await?;
    models.delete(&scope, model.id).await?;

    for id in [v1.id, v2.id] {
        assert!(matches!(
            versions.get_by_id(&scope, id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    // Rows stay behind with the deletion marker set.
    let rows = model_version::Entity::find()
        .filter(model_version::Column::RegisteredModelId.eq(model.id))
        .all(&db)
        .await?;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.deleted_at.is_some()));
    for row in &rows {
        let before = if row.id == v2.id { ahead } else { v1.updated_at };
        assert!(row.updated_at > before);
    }

    // A fresh model may reuse the name and version names.
    let again = models.create(&scope, &new_model("cascade")).await?;
    versions.create(&scope, &new_version(again.id, "v1", true)).await?;

    Ok(())
}

#[tokio::test]
async fn test_count_ready_guards_delete() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db.clone());
    let versions = ModelVersionRepository::new(db);
    let scope = ctx.scope(Uuid::new_v4());

    let model = ctx
        .registered_model_service()
        .create(
            &scope,
            CreateRegisteredModel {
                name: "guarded".to_string(),
                ..Default::default()
            },
        )
        .await?;
    let version = versions.create(&scope, &new_version(model.id, "v1", false)).await?;
    assert_eq!(versions.count_ready(&scope, model.id).await?, 0);

    ctx.model_version_service()
        .update(
            &scope,
            version.id,
            UpdateModelVersion {
                status: Some("READY".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(versions.count_ready(&scope, model.id).await?, 1);

    ctx.registered_model_service()
        .update(
            &scope,
            model.id,
            UpdateRegisteredModel {
                state: Some("ARCHIVED".to_string()),
                ..Default::default()
            },
        )
        .await?;

    let err = ctx
        .registered_model_service()
        .delete(&scope, model.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::PreconditionFailed);
    assert!(err.message().contains("READY"));

    // The store repeats the check on its own.
    assert!(matches!(
        RegisteredModelRepository::new(ctx.db().clone())
            .delete(&scope, model.id)
            .await,
        Err(StoreError::PreconditionFailed(_))
    ));

    ctx.model_version_service()
        .update(
            &scope,
            version.id,
            UpdateModelVersion {
                status: Some("FAILED".to_string()),
                ..Default::default()
            },
        )
        .await?;
    ctx.registered_model_service().delete(&scope, model.id).await?;

    Ok(())
}

#[tokio::test]
async fn test_clear_default_except_keeps_target() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db.clone());
    let versions = ModelVersionRepository::new(db);
    let scope = RequestScope::new(Uuid::new_v4());

    let model = models.create(&scope, &new_model("defaults")).await?;
    let v1 = versions.create(&scope, &new_version(model.id, "v1", true)).await?;
    let v2 = versions.create(&scope, &new_version(model.id, "v2", false)).await?;

    assert_eq!(versions.clear_default_except(&scope, model.id, v2.id).await?, 1);
    let v1_after = versions.get_by_id(&scope, v1.id).await?;
    assert!(!v1_after.is_default);
    assert!(v1_after.updated_at > v1.updated_at);

    // Nothing left to clear, and the kept row is never touched.
    assert_eq!(versions.clear_default_except(&scope, model.id, v2.id).await?, 0);
    assert_eq!(versions.get_by_id(&scope, v2.id).await?.updated_at, v2.updated_at);

    Ok(())
}

#[tokio::test]
async fn test_archiving_version_clears_default() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db);
    let scope = ctx.scope(Uuid::new_v4());
    let service = ctx.model_version_service();

    let model = ctx
        .registered_model_service()
        .create(
            &scope,
            CreateRegisteredModel {
                name: "retiring".to_string(),
                ..Default::default()
            },
        )
        .await?;
    let version = service
        .create(
            &scope,
            model.id,
            serde_json::from_value(serde_json::json!({
                "name": "v1",
                "uri": "s3://v1",
                "is_default": true
            }))?,
        )
        .await?;
    assert!(version.is_default);

    let archived = service
        .update(
            &scope,
            version.id,
            UpdateModelVersion {
                state: Some("ARCHIVED".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(archived.state, ModelState::Archived);
    assert!(!archived.is_default);

    let err = service
        .update(
            &scope,
            version.id,
            UpdateModelVersion {
                is_default: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::PreconditionFailed);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_duplicate_creates() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db);
    let project = Uuid::new_v4();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let ctx = ctx.clone();
        tasks.push(tokio::spawn(async move {
            let scope = ctx.scope(project);
            ctx.registered_model_service()
                .create(
                    &scope,
                    CreateRegisteredModel {
                        name: "racy".to_string(),
                        ..Default::default()
                    },
                )
                .await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.kind(), CoreErrorKind::AlreadyExists),
        }
    }
    assert_eq!(created, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_duplicate_version_creates() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db.clone());
    let scope = ctx.scope(Uuid::new_v4());
    let model_id = RegisteredModelRepository::new(db)
        .create(&scope, &new_model("versioned"))
        .await?
        .id;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let ctx = ctx.clone();
        let scope = scope.clone();
        tasks.push(tokio::spawn(async move {
            ctx.model_version_service()
                .create(
                    &scope,
                    model_id,
                    CreateModelVersion {
                        name: "v1".to_string(),
                        uri: "s3://models/v1".to_string(),
                        ..Default::default()
                    },
                )
                .await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err.kind(), CoreErrorKind::AlreadyExists),
        }
    }
    assert_eq!(created, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_default_flips_leave_one_default() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db.clone());
    let versions = ModelVersionRepository::new(db.clone());
    let scope = ctx.scope(Uuid::new_v4());

    let model = RegisteredModelRepository::new(db.clone())
        .create(&scope, &new_model("contested"))
        .await?;
    let mut ids = Vec::new();
    for i in 0..4 {
        let version = versions
            .create(&scope, &new_version(model.id, &format!("v{}", i), i == 0))
            .await?;
        ids.push(version.id);
    }

    let mut tasks = Vec::new();
    for id in ids.iter().copied() {
        let ctx = ctx.clone();
        let scope = scope.clone();
        tasks.push(tokio::spawn(async move {
            ctx.model_version_service()
                .update(
                    &scope,
                    id,
                    UpdateModelVersion {
                        is_default: Some(true),
                        ..Default::default()
                    },
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await? {
            Ok(version) => {
                assert!(version.is_default);
                succeeded += 1;
            }
            Err(err) => assert_eq!(err.kind(), CoreErrorKind::Unavailable),
        }
    }
    assert!(succeeded >= 1);

    let defaults = model_version::Entity::find()
        .filter(model_version::Column::RegisteredModelId.eq(model.id))
        .filter(model_version::Column::IsDefault.eq(true))
        .filter(model_version::Column::DeletedAt.is_null())
        .all(&db)
        .await?;
    assert_eq!(defaults.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_canceled_scope_skips_the_store() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db);
    let handle = CancelHandle::new();
    let scope = RequestScope::new(Uuid::new_v4()).with_cancel(&handle);

    handle.cancel();
    assert!(matches!(
        models.create(&scope, &new_model("never")).await,
        Err(StoreError::Canceled)
    ));
    assert!(matches!(
        models.update(&scope, Uuid::new_v4(), &archive(), None).await,
        Err(StoreError::Canceled)
    ));

    let fresh = RequestScope::new(scope.project_id());
    assert!(matches!(
        models.get_by_name(&fresh, "never").await,
        Err(StoreError::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_update_advances_updated_at() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db);
    let scope = RequestScope::new(Uuid::new_v4());

    let model = models.create(&scope, &new_model("ticking")).await?;
    let mut last = model.updated_at;
    for _ in 0..3 {
        let updated = models
            .update(&scope, model.id, &RegisteredModelPatch::default(), Some(last))
            .await?;
        assert!(updated.updated_at > last);
        last = updated.updated_at;
    }

    assert!(matches!(
        models
            .update(&scope, model.id, &RegisteredModelPatch::default(), Some(model.updated_at))
            .await,
        Err(StoreError::Stale(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_name_filter_treats_wildcards_literally() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db.clone());
    let versions = ModelVersionRepository::new(db);
    let scope = RequestScope::new(Uuid::new_v4());

    for name in ["a_b", "axb", "100%", "1000"] {
        models.create(&scope, &new_model(name)).await?;
    }

    assert_eq!(model_names(&models, &scope, "a_b").await?, vec!["a_b"]);
    assert_eq!(model_names(&models, &scope, "0%").await?, vec!["100%"]);
    assert_eq!(model_names(&models, &scope, "A_B").await?, vec!["a_b"]);
    assert_eq!(model_names(&models, &scope, "x").await?, vec!["axb"]);

    let parent = models.get_by_name(&scope, "axb").await?;
    versions.create(&scope, &new_version(parent.id, "v_1", false)).await?;
    versions.create(&scope, &new_version(parent.id, "vx1", false)).await?;
    let filter = ModelVersionFilter {
        name: Some("v_1".to_string()),
        ..Default::default()
    };
    let page = versions.list_all(&scope, &filter, Pagination::default()).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "v_1");

    Ok(())
}

#[tokio::test]
async fn test_model_reads_carry_version_summary() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let models = RegisteredModelRepository::new(db.clone());
    let versions = ModelVersionRepository::new(db);
    let scope = RequestScope::new(Uuid::new_v4());
    let stranger = RequestScope::new(Uuid::new_v4());

    let model = models.create(&scope, &new_model("summarized")).await?;
    assert_eq!(model.versions.version_count, 0);
    let empty = models.create(&scope, &new_model("bare")).await?;

    let v1 = versions.create(&scope, &new_version(model.id, "v1", true)).await?;
    let v2 = versions.create(&scope, &new_version(model.id, "v2", false)).await?;
    models.create(&stranger, &new_model("summarized")).await?;

    let read = models.get_by_id(&scope, model.id).await?;
    assert_eq!(read.versions.version_count, 2);
    assert_eq!(read.versions.latest_version.map(|v| v.id), Some(v2.id));
    assert_eq!(read.versions.default_version.map(|v| v.id), Some(v1.id));

    let by_name = models.get_by_name(&scope, "summarized").await?;
    assert_eq!(by_name.versions.version_count, 2);

    // Archiving the default leaves the model without one.
    let archive_version = ModelVersionPatch {
        state: Some(ModelState::Archived),
        ..Default::default()
    };
    versions.update(&scope, v1.id, &archive_version, None).await?;
    let read = models.get_by_id(&scope, model.id).await?;
    assert!(read.versions.default_version.is_none());
    assert_eq!(read.versions.version_count, 2);

    let page = models
        .list(&scope, &RegisteredModelFilter::default(), Pagination::default())
        .await?;
    for item in &page.items {
        let expected = if item.id == empty.id { 0 } else { 2 };
        assert_eq!(item.versions.version_count, expected);
        assert!(item.versions.latest_version.is_none());
    }

    Ok(())
}

#[tokio::test]
async fn test_blank_patch_text_clears_the_column() -> Result<()> {
    let (db, _db_file) = setup_test_db().await?;
    let ctx = AppContext::new(db);
    let scope = ctx.scope(Uuid::new_v4());
    let service = ctx.registered_model_service();

    let model = service
        .create(
            &scope,
            CreateRegisteredModel {
                name: "described".to_string(),
                description: Some("  a model  ".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(model.description.as_deref(), Some("a model"));

    let cleared = service
        .update(
            &scope,
            model.id,
            UpdateRegisteredModel {
                description: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(cleared.description, None);

    let version = ctx
        .model_version_service()
        .create(
            &scope,
            model.id,
            CreateModelVersion {
                name: "v1".to_string(),
                uri: "s3://models/v1".to_string(),
                container_image: Some("registry/img:1".to_string()),
                ..Default::default()
            },
        )
        .await?;
    let version = ctx
        .model_version_service()
        .update(
            &scope,
            version.id,
            UpdateModelVersion {
                container_image: Some(" ".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(version.container_image, None);

    Ok(())
}
