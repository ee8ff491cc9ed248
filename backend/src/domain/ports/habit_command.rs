//! Driving port for habit mutations and completion recording.

use async_trait::async_trait;

use crate::domain::{EpicId, Error, Habit, HabitCommit, HabitCommitId, HabitId, HabitStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateHabitRequest {
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    /// Recurrence expression; `None` applies the default daily schedule.
    pub schedule: Option<String>,
    /// Completions per period; `None` means one.
    pub target_count: Option<u32>,
}

/// Partial habit update. Derived statistics are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub schedule: Option<String>,
    pub target_count: Option<u32>,
    pub status: Option<HabitStatus>,
    pub epic_id: Option<Option<EpicId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateHabitRequest {
    pub habit_id: HabitId,
    pub patch: HabitPatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCompletionRequest {
    pub habit_id: HabitId,
    pub description: Option<String>,
    /// Raw effort score, validated against `1..=5`.
    pub effort: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCommitRequest {
    pub habit_id: HabitId,
    pub commit_id: HabitCommitId,
    pub description: Option<Option<String>>,
    pub effort: Option<u8>,
}

/// Driving port for habit write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HabitCommand: Send + Sync {
    async fn create_habit(&self, request: CreateHabitRequest) -> Result<Habit, Error>;

    /// Apply a partial update; schedule or target changes refresh the combos.
    async fn update_habit(&self, request: UpdateHabitRequest) -> Result<Habit, Error>;

    async fn update_habit_status(
        &self,
        habit_id: HabitId,
        status: HabitStatus,
    ) -> Result<Habit, Error>;

    /// Delete a habit with its whole completion log.
    async fn delete_habit(&self, habit_id: HabitId) -> Result<(), Error>;

    /// Append a completion stamped now and refresh the cached statistics.
    async fn record_completion(
        &self,
        request: RecordCompletionRequest,
    ) -> Result<HabitCommit, Error>;

    /// Edit a commit's note or effort. Streak statistics are unaffected.
    async fn update_commit(&self, request: UpdateCommitRequest) -> Result<HabitCommit, Error>;

    /// Rebuild the cached statistics from the completion log alone.
    async fn recompute_stats(&self, habit_id: HabitId) -> Result<Habit, Error>;
}
