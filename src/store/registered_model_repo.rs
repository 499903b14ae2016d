use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use sea_orm::sea_query::Expr;
use tracing::debug;
use uuid::Uuid;

use super::model_version_repo::{count_ready_versions, count_versions_by_model, version_summary};
use super::{
    begin_serializable, name_contains, next_updated_at, now_micros, sql_order, with_retry,
    RequestScope,
};
use crate::database::entities::{encode_json, model_version, registered_model};
use crate::domain::{
    ModelState, NewRegisteredModel, Page, Pagination, RegisteredModel, RegisteredModelFilter,
    RegisteredModelPatch, SortField,
};
use crate::errors::{StoreError, StoreResult};

const ENTITY: &str = "registered model";

fn live(scope: &RequestScope) -> Select<registered_model::Entity> {
    registered_model::Entity::find()
        .filter(registered_model::Column::ProjectId.eq(scope.project_id()))
        .filter(registered_model::Column::DeletedAt.is_null())
}

async fn find_live<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    id: Uuid,
) -> StoreResult<registered_model::Model> {
    live(scope)
        .filter(registered_model::Column::Id.eq(id))
        .one(conn)
        .await?
        .ok_or(StoreError::NotFound(ENTITY))
}

/// Loads the parent of a version inside the caller's transaction.
pub(crate) async fn find_parent<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    id: Uuid,
) -> StoreResult<RegisteredModel> {
    Ok(find_live(conn, scope, id).await?.try_into()?)
}

async fn with_versions<C: ConnectionTrait>(
    conn: &C,
    scope: &RequestScope,
    row: registered_model::Model,
) -> StoreResult<RegisteredModel> {
    let mut model = RegisteredModel::try_from(row)?;
    model.versions = version_summary(conn, scope, model.id).await?;
    Ok(model)
}

pub struct RegisteredModelRepository {
    db: DatabaseConnection,
}

impl RegisteredModelRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        scope: &RequestScope,
        input: &NewRegisteredModel,
    ) -> StoreResult<RegisteredModel> {
        scope.run(self.insert_row(scope, input)).await
    }

    async fn insert_row(
        &self,
        scope: &RequestScope,
        input: &NewRegisteredModel,
    ) -> StoreResult<RegisteredModel> {
        let now = now_micros();
        let row = registered_model::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(scope.project_id()),
            name: Set(input.name.clone()),
            description: Set(input.description.clone()),
            model_type: Set(input.model_type.clone()),
            region_id: Set(input.region_id),
            tags: Set(encode_json(&input.tags)?),
            labels: Set(encode_json(&input.labels)?),
            state: Set(ModelState::Active.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        debug!(id = %row.id, project_id = %row.project_id, "inserted registered model");
        Ok(row.try_into()?)
    }

    /// The model together with its version summary.
    pub async fn get_by_id(&self, scope: &RequestScope, id: Uuid) -> StoreResult<RegisteredModel> {
        scope.run(self.find_by_id(scope, id)).await
    }

    async fn find_by_id(&self, scope: &RequestScope, id: Uuid) -> StoreResult<RegisteredModel> {
        let row = find_live(&self.db, scope, id).await?;
        with_versions(&self.db, scope, row).await
    }

    pub async fn get_by_name(
        &self,
        scope: &RequestScope,
        name: &str,
    ) -> StoreResult<RegisteredModel> {
        scope.run(self.find_by_name(scope, name)).await
    }

    async fn find_by_name(&self, scope: &RequestScope, name: &str) -> StoreResult<RegisteredModel> {
        let row = live(scope)
            .filter(registered_model::Column::Name.eq(name))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(ENTITY))?;
        with_versions(&self.db, scope, row).await
    }

    pub async fn list(
        &self,
        scope: &RequestScope,
        filter: &RegisteredModelFilter,
        page: Pagination,
    ) -> StoreResult<Page<RegisteredModel>> {
        scope.run(self.select_page(scope, filter, page)).await
    }

    async fn select_page(
        &self,
        scope: &RequestScope,
        filter: &RegisteredModelFilter,
        page: Pagination,
    ) -> StoreResult<Page<RegisteredModel>> {
        let mut query = live(scope);
        if let Some(name) = &filter.name {
            query = query.filter(name_contains(registered_model::Column::Name, name));
        }
        if let Some(state) = filter.state {
            query = query.filter(registered_model::Column::State.eq(state.as_str()));
        }
        if let Some(model_type) = &filter.model_type {
            query = query.filter(registered_model::Column::ModelType.eq(model_type.as_str()));
        }
        if let Some(region_id) = filter.region_id {
            query = query.filter(registered_model::Column::RegionId.eq(region_id));
        }

        let total = query.clone().count(&self.db).await?;
        if page.limit == 0 || page.offset >= total {
            return Ok(Page::empty(total, page));
        }

        let sort_column = match filter.sort.field {
            SortField::CreatedAt => registered_model::Column::CreatedAt,
            SortField::UpdatedAt => registered_model::Column::UpdatedAt,
            SortField::Name => registered_model::Column::Name,
        };
        let rows = query
            .order_by(sort_column, sql_order(filter.sort.order))
            .order_by(registered_model::Column::Id, sql_order(filter.sort.order))
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.db)
            .await?;

        let mut items = rows
            .into_iter()
            .map(RegisteredModel::try_from)
            .collect::<Result<Vec<_>, DbErr>>()?;
        let counts = count_versions_by_model(
            &self.db,
            scope,
            items.iter().map(|model| model.id).collect(),
        )
        .await?;
        for model in &mut items {
            model.versions.version_count = counts.get(&model.id).copied().unwrap_or(0);
        }
        Ok(Page::new(items, total, page))
    }

    /// Applies `patch` as a compare-and-swap on the row's `updated_at`.
    ///
    /// With `expected_updated_at` a moved row fails with `Stale`; without it
    /// the transaction is replayed against the fresh row.
    pub async fn update(
        &self,
        scope: &RequestScope,
        id: Uuid,
        patch: &RegisteredModelPatch,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> StoreResult<RegisteredModel> {
        with_retry(scope, "registered_model.update", move || {
            self.update_once(scope, id, patch, expected_updated_at)
        })
        .await
    }

    async fn update_once(
        &self,
        scope: &RequestScope,
        id: Uuid,
        patch: &RegisteredModelPatch,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> StoreResult<RegisteredModel> {
        let txn = begin_serializable(&self.db).await?;
        let current = find_live(&txn, scope, id).await?;
        if let Some(expected) = expected_updated_at {
            if current.updated_at != expected {
                return Err(StoreError::Stale(ENTITY));
            }
        }
        RegisteredModel::try_from(current.clone())?.check_patch(patch)?;

        let mut changes = <registered_model::ActiveModel as Default>::default();
        if let Some(description) = &patch.description {
            changes.description = Set(description.clone());
        }
        if let Some(model_type) = &patch.model_type {
            changes.model_type = Set(Some(model_type.clone()));
        }
        if let Some(region_id) = patch.region_id {
            changes.region_id = Set(Some(region_id));
        }
        if let Some(tags) = &patch.tags {
            changes.tags = Set(encode_json(tags)?);
        }
        if let Some(labels) = &patch.labels {
            changes.labels = Set(encode_json(labels)?);
        }
        if let Some(state) = patch.state {
            changes.state = Set(state.as_str().to_string());
        }
        changes.updated_at = Set(next_updated_at(current.updated_at));

        let result = registered_model::Entity::update_many()
            .set(changes)
            .filter(registered_model::Column::Id.eq(id))
            .filter(registered_model::Column::ProjectId.eq(scope.project_id()))
            .filter(registered_model::Column::DeletedAt.is_null())
            .filter(registered_model::Column::UpdatedAt.eq(current.updated_at))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(match expected_updated_at {
                Some(_) => StoreError::Stale(ENTITY),
                None => StoreError::Retryable(DbErr::RecordNotUpdated),
            });
        }

        let updated = find_live(&txn, scope, id).await?;
        let updated = with_versions(&txn, scope, updated).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Soft-deletes an archived model with no READY versions, together with
    /// all of its versions.
    pub async fn delete(&self, scope: &RequestScope, id: Uuid) -> StoreResult<()> {
        with_retry(scope, "registered_model.delete", move || self.delete_once(scope, id)).await
    }

    async fn delete_once(&self, scope: &RequestScope, id: Uuid) -> StoreResult<()> {
        let txn = begin_serializable(&self.db).await?;
        let current = find_live(&txn, scope, id).await?;

        if count_ready_versions(&txn, scope, id).await? > 0 {
            return Err(StoreError::PreconditionFailed(
                "registered model has READY versions".to_string(),
            ));
        }
        if current.state != ModelState::Archived.as_str() {
            return Err(StoreError::PreconditionFailed(
                "registered model is not archived".to_string(),
            ));
        }

        let now = now_micros();
        let result = registered_model::Entity::update_many()
            .col_expr(registered_model::Column::DeletedAt, Expr::value(now))
            .col_expr(
                registered_model::Column::UpdatedAt,
                Expr::value(next_updated_at(current.updated_at)),
            )
            .filter(registered_model::Column::Id.eq(id))
            .filter(registered_model::Column::ProjectId.eq(scope.project_id()))
            .filter(registered_model::Column::UpdatedAt.eq(current.updated_at))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::Retryable(DbErr::RecordNotUpdated));
        }

        let versions = model_version::Entity::find()
            .filter(model_version::Column::ProjectId.eq(scope.project_id()))
            .filter(model_version::Column::RegisteredModelId.eq(id))
            .filter(model_version::Column::DeletedAt.is_null())
            .all(&txn)
            .await?;
        let mut cascaded = 0;
        for version in &versions {
            let result = model_version::Entity::update_many()
                .col_expr(model_version::Column::DeletedAt, Expr::value(now))
                .col_expr(
                    model_version::Column::UpdatedAt,
                    Expr::value(next_updated_at(version.updated_at)),
                )
                .filter(model_version::Column::Id.eq(version.id))
                .filter(model_version::Column::ProjectId.eq(scope.project_id()))
                .exec(&txn)
                .await?;
            cascaded += result.rows_affected;
        }

        txn.commit().await?;
        debug!(
            %id,
            project_id = %scope.project_id(),
            versions = cascaded,
            "soft-deleted registered model"
        );
        Ok(())
    }
}
