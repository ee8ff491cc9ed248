//! PostgreSQL-backed `HabitRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{HabitFilter, HabitRepository, HabitRepositoryError};
use crate::domain::{
    ComboStats, Effort, EpicId, Habit, HabitCommit, HabitCommitId, HabitDraft, HabitId,
    HabitStatus, Schedule,
};

use super::diesel_error_mapping::{ErrorConstructors, map_diesel_error, map_pool_error};
use super::models::{HabitChangeset, HabitCommitRow, HabitRow};
use super::pool::{DbPool, PoolError};
use super::schema::{habit_commits, habits};

const ERRORS: ErrorConstructors<HabitRepositoryError> = ErrorConstructors {
    connection: |message| HabitRepositoryError::connection(message),
    query: |message| HabitRepositoryError::query(message),
    not_found: |message| HabitRepositoryError::not_found(message),
    conflict: None,
};

fn pool_error(error: PoolError) -> HabitRepositoryError {
    map_pool_error(error, &ERRORS)
}

fn diesel_error(error: diesel::result::Error) -> HabitRepositoryError {
    map_diesel_error(error, &ERRORS)
}

/// Diesel-backed implementation of the habit repository port.
#[derive(Clone)]
pub struct DieselHabitRepository {
    pool: DbPool,
}

impl DieselHabitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn corrupt(field: &str, detail: impl std::fmt::Display) -> HabitRepositoryError {
    HabitRepositoryError::query(format!("stored habit has invalid {field}: {detail}"))
}

fn to_count(field: &str, value: i32) -> Result<u32, HabitRepositoryError> {
    u32::try_from(value).map_err(|err| corrupt(field, err))
}

fn to_db_count(field: &str, value: u32) -> Result<i32, HabitRepositoryError> {
    i32::try_from(value).map_err(|err| {
        HabitRepositoryError::query(format!("{field} {value} exceeds column range: {err}"))
    })
}

fn row_to_habit(row: HabitRow) -> Result<Habit, HabitRepositoryError> {
    let schedule = Schedule::parse(&row.schedule).map_err(|err| corrupt("schedule", err))?;
    let status: HabitStatus = row.status.parse().map_err(|err| corrupt("status", err))?;
    let stats = ComboStats {
        current_combo: to_count("current_combo", row.current_combo)?,
        best_combo: to_count("best_combo", row.best_combo)?,
        total_completions: to_count("total_completions", row.total_completions)?,
    };
    Habit::new(HabitDraft {
        id: HabitId::from_uuid(row.id),
        epic_id: row.epic_id.map(EpicId::from_uuid),
        title: row.title,
        description: row.description,
        schedule,
        target_count: to_count("target_count", row.target_count)?,
        status,
        stats,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
    .map_err(|err| HabitRepositoryError::query(err.to_string()))
}

fn habit_to_row(habit: &Habit) -> Result<HabitRow, HabitRepositoryError> {
    let stats = habit.stats();
    Ok(HabitRow {
        id: *habit.id().as_uuid(),
        epic_id: habit.epic_id().map(|id| *id.as_uuid()),
        title: habit.title().to_owned(),
        description: habit.description().map(str::to_owned),
        schedule: habit.schedule().expression().to_owned(),
        target_count: to_db_count("target_count", habit.target_count())?,
        status: habit.status().as_str().to_owned(),
        current_combo: to_db_count("current_combo", stats.current_combo)?,
        best_combo: to_db_count("best_combo", stats.best_combo)?,
        total_completions: to_db_count("total_completions", stats.total_completions)?,
        created_at: habit.created_at(),
        updated_at: habit.updated_at(),
    })
}

fn habit_changeset(habit: &Habit) -> Result<HabitChangeset<'_>, HabitRepositoryError> {
    Ok(HabitChangeset {
        epic_id: habit.epic_id().map(|id| *id.as_uuid()),
        title: habit.title(),
        description: habit.description(),
        schedule: habit.schedule().expression(),
        target_count: to_db_count("target_count", habit.target_count())?,
        status: habit.status().as_str(),
        updated_at: habit.updated_at(),
    })
}

/// Failure inside a habit transaction.
enum TxError {
    Diesel(diesel::result::Error),
    Repository(HabitRepositoryError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<HabitRepositoryError> for TxError {
    fn from(error: HabitRepositoryError) -> Self {
        Self::Repository(error)
    }
}

fn tx_error(error: TxError) -> HabitRepositoryError {
    match error {
        TxError::Diesel(error) => diesel_error(error),
        TxError::Repository(error) => error,
    }
}

/// Lock the habit row for the rest of the transaction.
async fn lock_habit(conn: &mut AsyncPgConnection, habit_id: Uuid) -> Result<Habit, TxError> {
    let row = habits::table
        .find(habit_id)
        .select(HabitRow::as_select())
        .for_update()
        .first::<HabitRow>(conn)
        .await
        .optional()?
        .ok_or_else(|| HabitRepositoryError::not_found(format!("habit {habit_id} not found")))?;
    Ok(row_to_habit(row)?)
}

/// Recompute statistics for a locked habit from every stored commit.
async fn rebuild_locked(
    conn: &mut AsyncPgConnection,
    habit: Habit,
    now: DateTime<Utc>,
) -> Result<Habit, TxError> {
    let history = habit_commits::table
        .filter(habit_commits::habit_id.eq(habit.id().as_uuid()))
        .select(habit_commits::created_at)
        .load::<DateTime<Utc>>(conn)
        .await?;
    let stats = habit.derive_stats(&history, now);
    if stats == habit.stats() {
        return Ok(habit);
    }
    let row = diesel::update(habits::table.find(habit.id().as_uuid()))
        .set((
            habits::current_combo.eq(to_db_count("current_combo", stats.current_combo)?),
            habits::best_combo.eq(to_db_count("best_combo", stats.best_combo)?),
            habits::total_completions
                .eq(to_db_count("total_completions", stats.total_completions)?),
            habits::updated_at.eq(now),
        ))
        .returning(HabitRow::as_returning())
        .get_result::<HabitRow>(conn)
        .await?;
    Ok(row_to_habit(row)?)
}

fn row_to_commit(row: HabitCommitRow) -> Result<HabitCommit, HabitRepositoryError> {
    let raw = u8::try_from(row.effort).map_err(|err| corrupt("effort", err))?;
    Ok(HabitCommit {
        id: HabitCommitId::from_uuid(row.id),
        habit_id: HabitId::from_uuid(row.habit_id),
        description: row.description,
        effort: Effort::try_from(raw).map_err(|err| corrupt("effort", err))?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn commit_to_row(commit: &HabitCommit) -> HabitCommitRow {
    HabitCommitRow {
        id: *commit.id.as_uuid(),
        habit_id: *commit.habit_id.as_uuid(),
        description: commit.description.clone(),
        effort: i16::from(commit.effort.value()),
        created_at: commit.created_at,
        updated_at: commit.updated_at,
    }
}

#[async_trait]
impl HabitRepository for DieselHabitRepository {
    async fn insert(&self, habit: &Habit) -> Result<(), HabitRepositoryError> {
        let row = habit_to_row(habit)?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        diesel::insert_into(habits::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(diesel_error)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &HabitId) -> Result<Option<Habit>, HabitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = habits::table
            .find(id.as_uuid())
            .select(HabitRow::as_select())
            .first::<HabitRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(row_to_habit).transpose()
    }

    async fn list(&self, filter: &HabitFilter) -> Result<Vec<Habit>, HabitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let mut query = habits::table
            .order((habits::created_at.asc(), habits::id.asc()))
            .select(HabitRow::as_select())
            .into_boxed();
        if let Some(epic_id) = filter.epic_id {
            query = query.filter(habits::epic_id.eq(*epic_id.as_uuid()));
        }
        if let Some(status) = filter.status {
            query = query.filter(habits::status.eq(status.as_str()));
        }
        let rows = query
            .load::<HabitRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(row_to_habit).collect()
    }

    async fn update(&self, habit: &Habit) -> Result<Habit, HabitRepositoryError> {
        let changeset = habit_changeset(habit)?;
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = diesel::update(habits::table.find(habit.id().as_uuid()))
            .set(&changeset)
            .returning(HabitRow::as_returning())
            .get_result::<HabitRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?
            .ok_or_else(|| {
                HabitRepositoryError::not_found(format!("habit {} not found", habit.id()))
            })?;
        row_to_habit(row)
    }

    async fn delete(&self, id: &HabitId) -> Result<bool, HabitRepositoryError> {
        let habit_id = *id.as_uuid();
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed = conn
            .transaction(|conn| {
                async move {
                    diesel::delete(
                        habit_commits::table.filter(habit_commits::habit_id.eq(habit_id)),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(habits::table.find(habit_id))
                        .execute(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;
        Ok(removed > 0)
    }

    async fn append_commit(&self, commit: &HabitCommit) -> Result<Habit, HabitRepositoryError> {
        let commit_row = commit_to_row(commit);
        let habit_id = commit_row.habit_id;
        let now = commit.created_at;
        let mut pooled = self.pool.get().await.map_err(pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction(|conn| {
            async move {
                let habit = lock_habit(conn, habit_id).await?;
                diesel::insert_into(habit_commits::table)
                    .values(&commit_row)
                    .execute(conn)
                    .await?;
                rebuild_locked(conn, habit, now).await
            }
            .scope_boxed()
        })
        .await
        .map_err(tx_error)
    }

    async fn refresh_stats(
        &self,
        habit_id: &HabitId,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitRepositoryError> {
        let habit_id = *habit_id.as_uuid();
        let mut pooled = self.pool.get().await.map_err(pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction(|conn| {
            async move {
                let habit = lock_habit(conn, habit_id).await?;
                rebuild_locked(conn, habit, now).await
            }
            .scope_boxed()
        })
        .await
        .map_err(tx_error)
    }

    async fn list_commits(
        &self,
        habit_id: &HabitId,
        limit: u32,
    ) -> Result<Vec<HabitCommit>, HabitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows = habit_commits::table
            .filter(habit_commits::habit_id.eq(habit_id.as_uuid()))
            .order((habit_commits::created_at.desc(), habit_commits::id.desc()))
            .limit(i64::from(limit))
            .select(HabitCommitRow::as_select())
            .load::<HabitCommitRow>(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter().map(row_to_commit).collect()
    }

    async fn find_commit(
        &self,
        habit_id: &HabitId,
        commit_id: &HabitCommitId,
    ) -> Result<Option<HabitCommit>, HabitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = habit_commits::table
            .filter(habit_commits::id.eq(commit_id.as_uuid()))
            .filter(habit_commits::habit_id.eq(habit_id.as_uuid()))
            .select(HabitCommitRow::as_select())
            .first::<HabitCommitRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        row.map(row_to_commit).transpose()
    }

    async fn update_commit(&self, commit: &HabitCommit) -> Result<(), HabitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let updated = diesel::update(
            habit_commits::table
                .filter(habit_commits::id.eq(commit.id.as_uuid()))
                .filter(habit_commits::habit_id.eq(commit.habit_id.as_uuid())),
        )
        .set((
            habit_commits::description.eq(commit.description.as_deref()),
            habit_commits::effort.eq(i16::from(commit.effort.value())),
            habit_commits::updated_at.eq(commit.updated_at),
        ))
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;
        if updated == 0 {
            return Err(HabitRepositoryError::not_found(format!(
                "commit {} not found",
                commit.id
            )));
        }
        Ok(())
    }
}
