//! Habit streak engine.
//!
//! Records completions and keeps each habit's cached combo statistics in step
//! with its commit log. The repository rebuilds statistics from the full log
//! while it holds the habit's lock, so concurrent completions never overwrite
//! each other and a recompute always matches what recording produced.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use super::epic_tree_service::map_repository_error as map_epic_repository_error;
use crate::domain::ports::{
    CreateHabitRequest, EpicRepository, HabitCommand, HabitFilter, HabitPatch, HabitQuery,
    HabitRepository, HabitRepositoryError, ListCommitsRequest, RecordCompletionRequest,
    UpdateCommitRequest, UpdateHabitRequest,
};
use crate::domain::{
    ComboStats, Effort, EpicId, Error, Habit, HabitCommit, HabitCommitId, HabitDraft, HabitId,
    HabitStatus, Schedule,
};

fn map_repository_error(error: HabitRepositoryError) -> Error {
    match error {
        HabitRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("habit repository unavailable: {message}"))
        }
        HabitRepositoryError::Query { message } => {
            Error::internal(format!("habit repository error: {message}"))
        }
        HabitRepositoryError::NotFound { message } => Error::not_found(message),
    }
}

fn habit_not_found(id: HabitId) -> Error {
    Error::not_found(format!("habit {id} not found"))
}

fn parse_effort(raw: u8) -> Result<Effort, Error> {
    Effort::try_from(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

fn parse_schedule(raw: &str) -> Result<Schedule, Error> {
    Schedule::parse(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Habit service implementing the habit driving ports.
#[derive(Clone)]
pub struct HabitStreakService<H, E> {
    habit_repo: Arc<H>,
    epic_repo: Arc<E>,
    clock: Arc<dyn Clock>,
}

impl<H, E> HabitStreakService<H, E> {
    /// Create the service. The epic repository is only read, to validate links.
    pub fn new(habit_repo: Arc<H>, epic_repo: Arc<E>, clock: Arc<dyn Clock>) -> Self {
        Self {
            habit_repo,
            epic_repo,
            clock,
        }
    }
}

impl<H, E> HabitStreakService<H, E>
where
    H: HabitRepository,
    E: EpicRepository,
{
    async fn load(&self, id: HabitId) -> Result<Habit, Error> {
        self.habit_repo
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| habit_not_found(id))
    }

    async fn ensure_epic_exists(&self, epic_id: EpicId) -> Result<(), Error> {
        let found = self
            .epic_repo
            .find_by_id(&epic_id)
            .await
            .map_err(map_epic_repository_error)?;
        match found {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("epic {epic_id} not found"))),
        }
    }

    async fn load_commit(
        &self,
        habit_id: HabitId,
        commit_id: HabitCommitId,
    ) -> Result<HabitCommit, Error> {
        self.habit_repo
            .find_commit(&habit_id, &commit_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| {
                Error::not_found(format!("commit {commit_id} not found for habit {habit_id}"))
            })
    }
}

#[async_trait]
impl<H, E> HabitCommand for HabitStreakService<H, E>
where
    H: HabitRepository,
    E: EpicRepository,
{
    async fn create_habit(&self, request: CreateHabitRequest) -> Result<Habit, Error> {
        let CreateHabitRequest {
            epic_id,
            title,
            description,
            schedule,
            target_count,
        } = request;

        let schedule = match schedule {
            Some(raw) => parse_schedule(&raw)?,
            None => Schedule::default(),
        };
        if let Some(epic_id) = epic_id {
            self.ensure_epic_exists(epic_id).await?;
        }

        let now = self.clock.utc();
        let habit = Habit::new(HabitDraft {
            id: HabitId::random(),
            epic_id,
            title,
            description,
            schedule,
            target_count: target_count.unwrap_or(1),
            status: HabitStatus::Active,
            stats: ComboStats::default(),
            created_at: now,
            updated_at: now,
        })
        .map_err(|err| Error::invalid_request(format!("invalid habit: {err}")))?;

        self.habit_repo
            .insert(&habit)
            .await
            .map_err(map_repository_error)?;

        info!(habit_id = %habit.id(), schedule = %habit.schedule(), "habit created");
        Ok(habit)
    }

    async fn update_habit(&self, request: UpdateHabitRequest) -> Result<Habit, Error> {
        let UpdateHabitRequest { habit_id, patch } = request;
        let current = self.load(habit_id).await?;
        let HabitPatch {
            title,
            description,
            schedule,
            target_count,
            status,
            epic_id,
        } = patch;

        let mut draft = current.to_draft();
        if let Some(title) = title {
            draft.title = title;
        }
        if let Some(description) = description {
            draft.description = description;
        }
        if let Some(status) = status {
            draft.status = status;
        }
        if let Some(epic_id) = epic_id {
            if let Some(linked) = epic_id {
                self.ensure_epic_exists(linked).await?;
            }
            draft.epic_id = epic_id;
        }
        let mut cadence_changed = false;
        if let Some(raw) = schedule {
            let parsed = parse_schedule(&raw)?;
            cadence_changed |= parsed.cadence() != current.schedule().cadence();
            draft.schedule = parsed;
        }
        if let Some(target) = target_count {
            cadence_changed |= target != current.target_count();
            draft.target_count = target;
        }
        let now = self.clock.utc();
        draft.updated_at = now;

        let edited = Habit::new(draft)
            .map_err(|err| Error::invalid_request(format!("invalid habit: {err}")))?;

        let mut updated = self
            .habit_repo
            .update(&edited)
            .await
            .map_err(map_repository_error)?;
        if cadence_changed {
            updated = self
                .habit_repo
                .refresh_stats(&habit_id, now)
                .await
                .map_err(map_repository_error)?;
        }

        info!(habit_id = %habit_id, cadence_changed, "habit updated");
        Ok(updated)
    }

    async fn update_habit_status(
        &self,
        habit_id: HabitId,
        status: HabitStatus,
    ) -> Result<Habit, Error> {
        self.update_habit(UpdateHabitRequest {
            habit_id,
            patch: HabitPatch {
                status: Some(status),
                ..HabitPatch::default()
            },
        })
        .await
    }

    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), Error> {
        let deleted = self
            .habit_repo
            .delete(&habit_id)
            .await
            .map_err(map_repository_error)?;
        if !deleted {
            return Err(habit_not_found(habit_id));
        }
        info!(habit_id = %habit_id, "habit deleted");
        Ok(())
    }

    async fn record_completion(
        &self,
        request: RecordCompletionRequest,
    ) -> Result<HabitCommit, Error> {
        let RecordCompletionRequest {
            habit_id,
            description,
            effort,
        } = request;
        let effort = parse_effort(effort)?;
        self.load(habit_id).await?;

        let now = self.clock.utc();
        let commit = HabitCommit {
            id: HabitCommitId::random(),
            habit_id,
            description,
            effort,
            created_at: now,
            updated_at: now,
        };
        let updated = self
            .habit_repo
            .append_commit(&commit)
            .await
            .map_err(map_repository_error)?;
        let stats = updated.stats();

        info!(
            habit_id = %habit_id,
            commit_id = %commit.id,
            current_combo = stats.current_combo,
            best_combo = stats.best_combo,
            "habit completion recorded"
        );
        Ok(commit)
    }

    async fn update_commit(&self, request: UpdateCommitRequest) -> Result<HabitCommit, Error> {
        let UpdateCommitRequest {
            habit_id,
            commit_id,
            description,
            effort,
        } = request;
        let effort = effort.map(parse_effort).transpose()?;
        self.load(habit_id).await?;
        let mut commit = self.load_commit(habit_id, commit_id).await?;

        if let Some(description) = description {
            commit.description = description;
        }
        if let Some(effort) = effort {
            commit.effort = effort;
        }
        commit.updated_at = self.clock.utc();

        self.habit_repo
            .update_commit(&commit)
            .await
            .map_err(map_repository_error)?;
        Ok(commit)
    }

    async fn recompute_stats(&self, habit_id: HabitId) -> Result<Habit, Error> {
        self.load(habit_id).await?;
        let updated = self
            .habit_repo
            .refresh_stats(&habit_id, self.clock.utc())
            .await
            .map_err(map_repository_error)?;
        info!(habit_id = %habit_id, "habit statistics rebuilt");
        Ok(updated)
    }
}

#[async_trait]
impl<H, E> HabitQuery for HabitStreakService<H, E>
where
    H: HabitRepository,
    E: EpicRepository,
{
    async fn get_habit(&self, habit_id: HabitId) -> Result<Habit, Error> {
        self.load(habit_id).await
    }

    async fn list_habits(&self, filter: HabitFilter) -> Result<Vec<Habit>, Error> {
        self.habit_repo
            .list(&filter)
            .await
            .map_err(map_repository_error)
    }

    async fn list_commits(&self, request: ListCommitsRequest) -> Result<Vec<HabitCommit>, Error> {
        self.load(request.habit_id).await?;
        self.habit_repo
            .list_commits(&request.habit_id, request.effective_limit())
            .await
            .map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "habit_streak_service_tests.rs"]
mod tests;
