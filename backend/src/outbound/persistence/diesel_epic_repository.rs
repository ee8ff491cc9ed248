//! PostgreSQL-backed `EpicRepository` implementation using Diesel ORM.
//!
//! Every epic write keeps the `epic_relations` index in step inside the same
//! transaction, so the index never disagrees with `epics.core_epic_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{EpicPage, EpicRepository, EpicRepositoryError, RelationFilter};
use crate::domain::{Epic, EpicDraft, EpicId, EpicRelation, GridPosition};

use super::diesel_error_mapping::{ErrorConstructors, map_diesel_error, map_pool_error};
use super::models::{EpicChangeset, EpicRelationRow, EpicRow};
use super::pool::{DbPool, PoolError};
use super::schema::{epic_relations, epics, habits};

const ERRORS: ErrorConstructors<EpicRepositoryError> = ErrorConstructors {
    connection: |message| EpicRepositoryError::connection(message),
    query: |message| EpicRepositoryError::query(message),
    not_found: |message| EpicRepositoryError::not_found(message),
    conflict: Some(|message| EpicRepositoryError::conflict(message)),
};

fn pool_error(error: PoolError) -> EpicRepositoryError {
    map_pool_error(error, &ERRORS)
}

fn diesel_error(error: diesel::result::Error) -> EpicRepositoryError {
    map_diesel_error(error, &ERRORS)
}

/// Diesel-backed implementation of the epic repository port.
#[derive(Clone)]
pub struct DieselEpicRepository {
    pool: DbPool,
}

impl DieselEpicRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn corrupt(field: &str, detail: impl std::fmt::Display) -> EpicRepositoryError {
    EpicRepositoryError::query(format!("stored epic has invalid {field}: {detail}"))
}

fn row_to_epic(row: EpicRow) -> Result<Epic, EpicRepositoryError> {
    let depth = u32::try_from(row.depth).map_err(|err| corrupt("depth", err))?;
    let slot = u8::try_from(row.position).map_err(|err| corrupt("position", err))?;
    let position = GridPosition::try_from(slot).map_err(|err| corrupt("position", err))?;
    Epic::new(EpicDraft {
        id: EpicId::from_uuid(row.id),
        title: row.title,
        description: row.description,
        status: row.status,
        depth,
        position,
        core_epic_id: row.core_epic_id.map(EpicId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
    .map_err(|err| EpicRepositoryError::query(err.to_string()))
}

fn rows_to_epics(rows: Vec<EpicRow>) -> Result<Vec<Epic>, EpicRepositoryError> {
    rows.into_iter().map(row_to_epic).collect()
}

fn db_depth(depth: u32) -> Result<i32, EpicRepositoryError> {
    i32::try_from(depth).map_err(|err| EpicRepositoryError::query(format!("depth {depth}: {err}")))
}

fn epic_to_row(epic: &Epic) -> Result<EpicRow, EpicRepositoryError> {
    Ok(EpicRow {
        id: *epic.id().as_uuid(),
        title: epic.title().to_owned(),
        description: epic.description().map(str::to_owned),
        status: epic.status().to_owned(),
        depth: db_depth(epic.depth())?,
        position: i16::from(epic.position().slot()),
        core_epic_id: epic.core_epic_id().map(|id| *id.as_uuid()),
        created_at: epic.created_at(),
        updated_at: epic.updated_at(),
    })
}

fn epic_changeset(epic: &Epic) -> Result<EpicChangeset<'_>, EpicRepositoryError> {
    Ok(EpicChangeset {
        title: epic.title(),
        description: epic.description(),
        status: epic.status(),
        depth: db_depth(epic.depth())?,
        position: i16::from(epic.position().slot()),
        core_epic_id: epic.core_epic_id().map(|id| *id.as_uuid()),
        updated_at: epic.updated_at(),
    })
}

fn relation_to_row(relation: EpicRelation) -> Result<EpicRelationRow, EpicRepositoryError> {
    Ok(EpicRelationRow {
        core_epic_id: *relation.core_epic_id.as_uuid(),
        sub_epic_id: *relation.sub_epic_id.as_uuid(),
        position_row: i16::from(relation.position_row),
        position_col: i16::from(relation.position_col),
        depth: db_depth(relation.depth)?,
    })
}

fn row_to_relation(row: EpicRelationRow) -> Result<EpicRelation, EpicRepositoryError> {
    Ok(EpicRelation {
        core_epic_id: EpicId::from_uuid(row.core_epic_id),
        sub_epic_id: EpicId::from_uuid(row.sub_epic_id),
        position_row: u8::try_from(row.position_row).map_err(|err| corrupt("row", err))?,
        position_col: u8::try_from(row.position_col).map_err(|err| corrupt("column", err))?,
        depth: u32::try_from(row.depth).map_err(|err| corrupt("depth", err))?,
    })
}

fn uuids(ids: &[EpicId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

#[async_trait]
impl EpicRepository for DieselEpicRepository {
    async fn insert(&self, epic: &Epic) -> Result<(), EpicRepositoryError> {
        let row = epic_to_row(epic)?;
        let relation = epic.relation().map(relation_to_row).transpose()?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(epics::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                if let Some(relation) = relation {
                    diesel::insert_into(epic_relations::table)
                        .values(&relation)
                        .execute(conn)
                        .await?;
                }
                Ok::<_, diesel::result::Error>(())
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn find_by_id(&self, id: &EpicId) -> Result<Option<Epic>, EpicRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = epics::table
            .find(id.as_uuid())
            .select(EpicRow::as_select())
            .first::<EpicRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(row_to_epic).transpose()
    }

    async fn find_by_ids(&self, ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = epics::table
            .filter(epics::id.eq_any(uuids(ids)))
            .order((epics::created_at.asc(), epics::id.asc()))
            .select(EpicRow::as_select())
            .load::<EpicRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows_to_epics(rows)
    }

    async fn list(&self, page: EpicPage) -> Result<Vec<Epic>, EpicRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let mut query = epics::table
            .order((epics::created_at.asc(), epics::id.asc()))
            .select(EpicRow::as_select())
            .offset(i64::from(page.skip))
            .into_boxed();
        if let Some(limit) = page.limit {
            query = query.limit(i64::from(limit));
        }
        let rows = query
            .load::<EpicRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows_to_epics(rows)
    }

    async fn list_children(&self, parent_ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let parents: Vec<Option<Uuid>> = parent_ids.iter().map(|id| Some(*id.as_uuid())).collect();
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = epics::table
            .filter(epics::core_epic_id.eq_any(parents))
            .order((epics::position.asc(), epics::created_at.asc()))
            .select(EpicRow::as_select())
            .load::<EpicRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows_to_epics(rows)
    }

    async fn update_many(&self, epics_to_write: &[Epic]) -> Result<(), EpicRepositoryError> {
        let changes = epics_to_write
            .iter()
            .map(|epic| {
                let relation = epic.relation().map(relation_to_row).transpose()?;
                Ok((*epic.id().as_uuid(), epic_changeset(epic)?, relation))
            })
            .collect::<Result<Vec<_>, EpicRepositoryError>>()?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                for (id, changeset, relation) in &changes {
                    let updated = diesel::update(epics::table.find(id))
                        .set(changeset)
                        .execute(conn)
                        .await?;
                    if updated == 0 {
                        return Err(diesel::result::Error::NotFound);
                    }
                    diesel::delete(epic_relations::table.filter(epic_relations::sub_epic_id.eq(id)))
                        .execute(conn)
                        .await?;
                    if let Some(relation) = relation {
                        diesel::insert_into(epic_relations::table)
                            .values(relation)
                            .execute(conn)
                            .await?;
                    }
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn delete_many(
        &self,
        ids: &[EpicId],
        detached_at: DateTime<Utc>,
    ) -> Result<u64, EpicRepositoryError> {
        let targets = uuids(ids);
        let linked: Vec<Option<Uuid>> = targets.iter().copied().map(Some).collect();
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let removed = conn
            .transaction(|conn| {
                async move {
                    diesel::update(habits::table.filter(habits::epic_id.eq_any(linked)))
                        .set((
                            habits::epic_id.eq(None::<Uuid>),
                            habits::updated_at.eq(detached_at),
                        ))
                        .execute(conn)
                        .await?;
                    diesel::delete(
                        epic_relations::table.filter(
                            epic_relations::sub_epic_id
                                .eq_any(&targets)
                                .or(epic_relations::core_epic_id.eq_any(&targets)),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    let mut removed = 0_usize;
                    // Children precede parents in `targets`, so the parent
                    // foreign key never points at a deleted row.
                    for id in &targets {
                        removed += diesel::delete(epics::table.find(id)).execute(conn).await?;
                    }
                    Ok::<_, diesel::result::Error>(removed)
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;
        Ok(removed as u64)
    }

    async fn delete_all(&self, detached_at: DateTime<Utc>) -> Result<u64, EpicRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed = conn
            .transaction(|conn| {
                async move {
                    diesel::update(habits::table.filter(habits::epic_id.is_not_null()))
                        .set((
                            habits::epic_id.eq(None::<Uuid>),
                            habits::updated_at.eq(detached_at),
                        ))
                        .execute(conn)
                        .await?;
                    diesel::delete(epic_relations::table).execute(conn).await?;
                    diesel::delete(epics::table).execute(conn).await
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;
        Ok(removed as u64)
    }

    async fn find_relations(
        &self,
        filter: RelationFilter,
    ) -> Result<Vec<EpicRelation>, EpicRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let query = epic_relations::table
            .select(EpicRelationRow::as_select())
            .order((epic_relations::position_row.asc(), epic_relations::position_col.asc()))
            .into_boxed();
        let query = match filter {
            RelationFilter::Core(id) => {
                query.filter(epic_relations::core_epic_id.eq(*id.as_uuid()))
            }
            RelationFilter::Sub(id) => query.filter(epic_relations::sub_epic_id.eq(*id.as_uuid())),
        };
        let rows = query
            .load::<EpicRelationRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(row_to_relation).collect()
    }
}
