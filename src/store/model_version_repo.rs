use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use tracing::debug;
use uuid::Uuid;

use super::registered_model_repo::find_parent;
use super::{
    begin_serializable, name_contains, next_updated_at, now_micros, sql_order, with_retry,
    RequestScope,
};
use crate::database::entities::{encode_json, model_version};
use crate::domain::{
    ModelState, ModelVersion, ModelVersionFilter, ModelVersionPatch, NewModelVersion, Page,
    Pagination, SortField, VersionStatus, VersionSummary,
};
use crate::errors::{StoreError, StoreResult};

const ENTITY: &str = "model version";

fn live(scope: &RequestScope) -> Select<model_version::Entity> {
    model_version::Entity::find()
        .filter(model_version::Column::ProjectId.eq(scope.project_id()))
        .filter(model_version::Column::DeletedAt.is_null())
}

async fn find_live<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    id: Uuid,
) -> StoreResult<model_version::Model> {
    live(scope)
        .filter(model_version::Column::Id.eq(id))
        .one(conn)
        .await?
        .ok_or(StoreError::NotFound(ENTITY))
}

pub(crate) async fn count_ready_versions<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    registered_model_id: Uuid,
) -> StoreResult<u64> {
    Ok(live(scope)
        .filter(model_version::Column::RegisteredModelId.eq(registered_model_id))
        .filter(model_version::Column::Status.eq(VersionStatus::Ready.as_str()))
        .count(conn)
        .await?)
}

/// Count, newest and default among the live versions of one model.
pub(crate) async fn version_summary<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    registered_model_id: Uuid,
) -> StoreResult<VersionSummary> {
    let of_model =
        live(scope).filter(model_version::Column::RegisteredModelId.eq(registered_model_id));

    let version_count = of_model.clone().count(conn).await?;
    let latest_version = of_model
        .clone()
        .order_by_desc(model_version::Column::CreatedAt)
        .order_by_desc(model_version::Column::Id)
        .one(conn)
        .await?
        .map(ModelVersion::try_from)
        .transpose()?;
    let default_version = of_model
        .filter(model_version::Column::IsDefault.eq(true))
        .one(conn)
        .await?
        .map(ModelVersion::try_from)
        .transpose()?;

    Ok(VersionSummary {
        version_count,
        latest_version,
        default_version,
    })
}

/// Live version counts for a page of models, in one grouped query. Models
/// without versions are absent from the map.
pub(crate) async fn count_versions_by_model<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    registered_model_ids: Vec<Uuid>,
) -> StoreResult<HashMap<Uuid, u64>> {
    if registered_model_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let counts: Vec<(Uuid, i64)> = live(scope)
        .select_only()
        .column(model_version::Column::RegisteredModelId)
        .column_as(Expr::col(model_version::Column::Id).count(), "version_count")
        .filter(model_version::Column::RegisteredModelId.is_in(registered_model_ids))
        .group_by(model_version::Column::RegisteredModelId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(counts
        .into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect())
}

/// Drops the default flag from every live version of the model except
/// `keep_id`. Each cleared row gets its own monotonic `updated_at`.
async fn clear_default_in<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    registered_model_id: Uuid,
    keep_id: Uuid,
) -> StoreResult<u64> {
    let defaults = live(scope)
        .filter(model_version::Column::RegisteredModelId.eq(registered_model_id))
        .filter(model_version::Column::IsDefault.eq(true))
        .filter(model_version::Column::Id.ne(keep_id))
        .all(conn)
        .await?;

    let mut cleared = 0;
    for row in &defaults {
        let result = model_version::Entity::update_many()
            .col_expr(model_version::Column::IsDefault, Expr::value(false))
            .col_expr(
                model_version::Column::UpdatedAt,
                Expr::value(next_updated_at(row.updated_at)),
            )
            .filter(model_version::Column::Id.eq(row.id))
            .filter(model_version::Column::ProjectId.eq(scope.project_id()))
            .exec(conn)
            .await?;
        cleared += result.rows_affected;
    }
    Ok(cleared)
}

pub struct ModelVersionRepository {
    db: DatabaseConnection,
}

impl ModelVersionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a version under a live, ACTIVE parent. A default version
    /// takes the flag from its siblings in the same transaction.
    pub async fn create(
        &self,
        scope: &RequestScope,
        input: &NewModelVersion,
    ) -> StoreResult<ModelVersion> {
        with_retry(scope, "model_version.create", move || self.create_once(scope, input)).await
    }

    async fn create_once(
        &self,
        scope: &RequestScope,
        input: &NewModelVersion,
    ) -> StoreResult<ModelVersion> {
        let txn = begin_serializable(&self.db).await?;
        let parent = find_parent(&txn, scope, input.registered_model_id).await?;
        if parent.state == ModelState::Archived {
            return Err(StoreError::PreconditionFailed(
                "registered model is archived".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        if input.is_default {
            clear_default_in(&txn, scope, parent.id, id).await?;
        }

        let now = now_micros();
        let row = model_version::ActiveModel {
            id: Set(id),
            project_id: Set(scope.project_id()),
            registered_model_id: Set(parent.id),
            name: Set(input.name.clone()),
            uri: Set(input.uri.clone()),
            model_framework: Set(input.model_framework.clone()),
            model_framework_version: Set(input.model_framework_version.clone()),
            container_image: Set(input.container_image.clone()),
            artifact_type: Set(input.artifact_type.as_str().to_string()),
            is_artifact: Set(input.artifact_type.is_artifact()),
            is_default: Set(input.is_default),
            status: Set(VersionStatus::Pending.as_str().to_string()),
            state: Set(ModelState::Active.as_str().to_string()),
            labels: Set(encode_json(&input.labels)?),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        debug!(
            %id,
            registered_model_id = %parent.id,
            artifact_type = %input.artifact_type,
            "inserted model version"
        );
        Ok(row.try_into()?)
    }

    pub async fn get_by_id(&self, scope: &RequestScope, id: Uuid) -> StoreResult<ModelVersion> {
        scope.run(self.find_by_id(scope, id)).await
    }

    async fn find_by_id(&self, scope: &RequestScope, id: Uuid) -> StoreResult<ModelVersion> {
        Ok(find_live(&self.db, scope, id).await?.try_into()?)
    }

    pub async fn get_by_name(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        name: &str,
    ) -> StoreResult<ModelVersion> {
        scope
            .run(self.find_by_name(scope, registered_model_id, name))
            .await
    }

    async fn find_by_name(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        name: &str,
    ) -> StoreResult<ModelVersion> {
        let row = live(scope)
            .filter(model_version::Column::RegisteredModelId.eq(registered_model_id))
            .filter(model_version::Column::Name.eq(name))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(ENTITY))?;
        Ok(row.try_into()?)
    }

    pub async fn list_by_model(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        filter: &ModelVersionFilter,
        page: Pagination,
    ) -> StoreResult<Page<ModelVersion>> {
        let filter = ModelVersionFilter {
            registered_model_id: Some(registered_model_id),
            ..filter.clone()
        };
        self.list_all(scope, &filter, page).await
    }

    pub async fn list_all(
        &self,
        scope: &RequestScope,
        filter: &ModelVersionFilter,
        page: Pagination,
    ) -> StoreResult<Page<ModelVersion>> {
        scope.run(self.select_page(scope, filter, page)).await
    }

    async fn select_page(
        &self,
        scope: &RequestScope,
        filter: &ModelVersionFilter,
        page: Pagination,
    ) -> StoreResult<Page<ModelVersion>> {
        let mut query = live(scope);
        if let Some(registered_model_id) = filter.registered_model_id {
            query = query.filter(model_version::Column::RegisteredModelId.eq(registered_model_id));
        }
        if let Some(is_artifact) = filter.is_artifact {
            query = query.filter(model_version::Column::IsArtifact.eq(is_artifact));
        }
        if let Some(name) = &filter.name {
            query = query.filter(name_contains(model_version::Column::Name, name));
        }
        if let Some(state) = filter.state {
            query = query.filter(model_version::Column::State.eq(state.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(model_version::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await?;
        if page.limit == 0 || page.offset >= total {
            return Ok(Page::empty(total, page));
        }

        let sort_column = match filter.sort.field {
            SortField::CreatedAt => model_version::Column::CreatedAt,
            SortField::UpdatedAt => model_version::Column::UpdatedAt,
            SortField::Name => model_version::Column::Name,
        };
        let rows = query
            .order_by(sort_column, sql_order(filter.sort.order))
            .order_by(model_version::Column::Id, sql_order(filter.sort.order))
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(ModelVersion::try_from)
            .collect::<Result<Vec<_>, DbErr>>()?;
        Ok(Page::new(items, total, page))
    }

    /// Compare-and-swap update; see `RegisteredModelRepository::update`.
    ///
    /// Setting `is_default` clears the flag on the siblings first, and
    /// archiving always clears it on the target.
    pub async fn update(
        &self,
        scope: &RequestScope,
        id: Uuid,
        patch: &ModelVersionPatch,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> StoreResult<ModelVersion> {
        with_retry(scope, "model_version.update", move || {
            self.update_once(scope, id, patch, expected_updated_at)
        })
        .await
    }

    async fn update_once(
        &self,
        scope: &RequestScope,
        id: Uuid,
        patch: &ModelVersionPatch,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> StoreResult<ModelVersion> {
        let txn = begin_serializable(&self.db).await?;
        let current = find_live(&txn, scope, id).await?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(StoreError::Stale(ENTITY));
            }
        }
        let record = ModelVersion::try_from(current.clone())?;
        record.check_patch(patch)?;

        let mut changes = <model_version::ActiveModel as Default>::default();
        if let Some(uri) = &patch.uri {
            changes.uri = Set(uri.clone());
        }
        if let Some(framework) = &patch.model_framework {
            changes.model_framework = Set(framework.clone());
        }
        if let Some(framework_version) = &patch.model_framework_version {
            changes.model_framework_version = Set(framework_version.clone());
        }
        if let Some(image) = &patch.container_image {
            changes.container_image = Set(image.clone());
        }
        if let Some(labels) = &patch.labels {
            changes.labels = Set(encode_json(labels)?);
        }
        if let Some(status) = patch.status {
            changes.status = Set(status.as_str().to_string());
        }
        if let Some(state) = patch.state {
            changes.state = Set(state.as_str().to_string());
        }

        if record.state_after(patch) == ModelState::Archived {
            changes.is_default = Set(false);
        } else if let Some(is_default) = patch.is_default {
            if is_default {
                clear_default_in(&txn, scope, record.registered_model_id, id).await?;
            }
            changes.is_default = Set(is_default);
        }
        changes.updated_at = Set(next_updated_at(current.updated_at));

        let result = model_version::Entity::update_many()
            .set(changes)
            .filter(model_version::Column::Id.eq(id))
            .filter(model_version::Column::ProjectId.eq(scope.project_id()))
            .filter(model_version::Column::DeletedAt.is_null())
            .filter(model_version::Column::UpdatedAt.eq(current.updated_at))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(match expected_updated_at {
                Some(_) => StoreError::Stale(ENTITY),
                None => StoreError::Retryable(DbErr::RecordNotUpdated),
            });
        }

        let updated = find_live(&txn, scope, id).await?;
        txn.commit().await?;
        Ok(updated.try_into()?)
    }

    pub async fn count_ready(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
    ) -> StoreResult<u64> {
        scope
            .run(count_ready_versions(&self.db, scope, registered_model_id))
            .await
    }

    /// Standalone form of the default flip's first half.
    pub async fn clear_default_except(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        keep_id: Uuid,
    ) -> StoreResult<u64> {
        with_retry(scope, "model_version.clear_default", move || {
            self.clear_default_once(scope, registered_model_id, keep_id)
        })
        .await
    }

    async fn clear_default_once(
        &self,
        scope: &RequestScope,
        registered_model_id: Uuid,
        keep_id: Uuid,
    ) -> StoreResult<u64> {
        let txn = begin_serializable(&self.db).await?;
        let cleared = clear_default_in(&txn, scope, registered_model_id, keep_id).await?;
        txn.commit().await?;
        Ok(cleared)
    }
}
